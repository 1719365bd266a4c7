use nalgebra::{Point2, Vector4};
use serde::{Deserialize, Serialize};

use super::framebuffer::ColorImage;

#[derive(Copy, Clone, Default, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

#[derive(Copy, Clone, Default, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapMode {
    #[default]
    ClampToEdge,
    ClampToBorder,
    Repeat,
    MirroredRepeat,
}

impl WrapMode {
    /// Maps a texel coordinate into `0..size`, or `None` for the border.
    pub fn resolve(self, coord: i64, size: usize) -> Option<usize> {
        let size = size as i64;
        if size == 0 {
            return None;
        }

        let resolved = match self {
            WrapMode::ClampToEdge => coord.clamp(0, size - 1),
            WrapMode::ClampToBorder => {
                if coord < 0 || coord >= size {
                    return None;
                }
                coord
            }
            WrapMode::Repeat => coord.rem_euclid(size),
            WrapMode::MirroredRepeat => {
                let period = coord.rem_euclid(size * 2);
                if period < size {
                    period
                } else {
                    size * 2 - 1 - period
                }
            }
        };

        Some(resolved as usize)
    }
}

/// Filtering and addressing applied when a pass reads an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampler {
    pub filter: FilterMode,
    pub wrap: WrapMode,
    pub border_color: Vector4<f32>,
}

impl Default for Sampler {
    fn default() -> Self {
        Sampler {
            filter: FilterMode::Nearest,
            wrap: WrapMode::ClampToEdge,
            border_color: Vector4::zeros(),
        }
    }
}

impl Sampler {
    pub fn fetch(&self, image: &ColorImage, x: i64, y: i64) -> Vector4<f32> {
        let (width, height) = image.size();
        let texel = self
            .wrap
            .resolve(x, width)
            .zip(self.wrap.resolve(y, height))
            .and_then(|(x, y)| image.at(x, y));

        match texel {
            Some(value) => *value,
            None => self.border_color,
        }
    }

    /// Samples at normalized coordinates, (0, 0) being the top-left corner.
    pub fn sample(&self, image: &ColorImage, uv: Point2<f32>) -> Vector4<f32> {
        let (width, height) = image.size();
        let u = uv.x * width as f32;
        let v = uv.y * height as f32;

        match self.filter {
            FilterMode::Nearest => self.fetch(image, u.floor() as i64, v.floor() as i64),
            FilterMode::Linear => {
                let u = u - 0.5;
                let v = v - 0.5;

                let x0 = u.floor();
                let y0 = v.floor();
                let fx = u - x0;
                let fy = v - y0;

                // float to int casts saturate, so the neighbour must too
                let (x0, y0) = (x0 as i64, y0 as i64);
                let (x1, y1) = (x0.saturating_add(1), y0.saturating_add(1));

                let top = self.fetch(image, x0, y0).lerp(&self.fetch(image, x1, y0), fx);
                let bottom = self.fetch(image, x0, y1).lerp(&self.fetch(image, x1, y1), fx);

                top.lerp(&bottom, fy)
            }
        }
    }
}
