use nalgebra::Vector4;

/// 8-bit unorm color, packed as `0xRRGGBBAA`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RGBA8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

fn quantize(channel: f32) -> u8 {
    // NaN maps to 0 through the saturating cast
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl From<u32> for RGBA8 {
    fn from(value: u32) -> Self {
        let [r, g, b, a] = value.to_be_bytes();
        RGBA8 { r, g, b, a }
    }
}

impl From<RGBA8> for u32 {
    fn from(value: RGBA8) -> Self {
        u32::from_be_bytes([value.r, value.g, value.b, value.a])
    }
}

impl From<Vector4<f32>> for RGBA8 {
    fn from(value: Vector4<f32>) -> Self {
        RGBA8 {
            r: quantize(value.x),
            g: quantize(value.y),
            b: quantize(value.z),
            a: quantize(value.w),
        }
    }
}

impl From<RGBA8> for Vector4<f32> {
    fn from(value: RGBA8) -> Self {
        Vector4::new(value.r, value.g, value.b, value.a).map(|c| c as f32 / 255.0)
    }
}
