use std::mem::{offset_of, size_of};

use nalgebra::{Matrix4, Point3, Vector3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    Float32x3,
}

impl VertexFormat {
    pub const fn size(self) -> usize {
        match self {
            VertexFormat::Float32x3 => 3 * size_of::<f32>(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    Vertex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: VertexFormat,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBufferLayout {
    pub binding: u32,
    pub stride: usize,
    pub step_mode: StepMode,
    pub attributes: &'static [VertexAttribute],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushConstantRange {
    pub stage: ShaderStage,
    pub offset: usize,
    pub size: usize,
}

/// Per-vertex input of the geometry pass.
///
/// `normal` is not read by the transform but keeps its slot so the
/// buffer layout stays stable.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex {
    pub const ATTRIBUTES: [VertexAttribute; 3] = [
        VertexAttribute {
            location: 0,
            format: VertexFormat::Float32x3,
            offset: offset_of!(Vertex, position),
        },
        VertexAttribute {
            location: 1,
            format: VertexFormat::Float32x3,
            offset: offset_of!(Vertex, normal),
        },
        VertexAttribute {
            location: 2,
            format: VertexFormat::Float32x3,
            offset: offset_of!(Vertex, color),
        },
    ];

    pub fn new(position: Point3<f32>, normal: Vector3<f32>, color: Vector3<f32>) -> Vertex {
        Vertex {
            position: position.coords.into(),
            normal: normal.into(),
            color: color.into(),
        }
    }

    pub fn layout() -> VertexBufferLayout {
        VertexBufferLayout {
            binding: 0,
            stride: size_of::<Vertex>(),
            step_mode: StepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    pub fn position(&self) -> Point3<f32> {
        Point3::from(self.position)
    }

    pub fn normal(&self) -> Vector3<f32> {
        Vector3::from(self.normal)
    }

    pub fn color(&self) -> Vector3<f32> {
        Vector3::from(self.color)
    }
}

/// Per-draw push constants: an auxiliary vector followed by the
/// model-view-projection matrix, laid out as a `vec3` + `mat4` push
/// constant block (the matrix starts at offset 16).
///
/// Values are immutable. A draw with a different transform gets a new
/// block from [`DrawParams::new`] or one of the `with_*` builders.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawParams {
    data: [f32; 3],
    _pad: f32,
    render_matrix: [[f32; 4]; 4],
}

impl Default for DrawParams {
    fn default() -> Self {
        DrawParams::new(Vector3::zeros(), &Matrix4::identity())
    }
}

impl DrawParams {
    pub const PUSH_CONSTANT_RANGE: PushConstantRange = PushConstantRange {
        stage: ShaderStage::Vertex,
        offset: 0,
        size: size_of::<DrawParams>(),
    };

    pub fn new(data: Vector3<f32>, render_matrix: &Matrix4<f32>) -> DrawParams {
        DrawParams {
            data: data.into(),
            _pad: 0.0,
            // column-major, same as the shader side
            render_matrix: (*render_matrix).into(),
        }
    }

    pub fn with_render_matrix(self, render_matrix: &Matrix4<f32>) -> DrawParams {
        DrawParams::new(self.data(), render_matrix)
    }

    pub fn with_data(self, data: Vector3<f32>) -> DrawParams {
        DrawParams::new(data, &self.render_matrix())
    }

    /// Reserved auxiliary vector. Not read by the transform.
    pub fn data(&self) -> Vector3<f32> {
        Vector3::from(self.data)
    }

    pub fn render_matrix(&self) -> Matrix4<f32> {
        Matrix4::from(self.render_matrix)
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}
