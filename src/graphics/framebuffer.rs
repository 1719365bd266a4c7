use std::iter;
use std::sync::Arc;

use nalgebra::Vector4;

use super::image::Image;
use crate::error::{RenderError, Result};

pub type ColorImage = Image<Vector4<f32>>;

/// Color attachments are shared with readers through `Arc`. Writing to an
/// attachment that is still being read detaches it first (copy-on-write),
/// so a snapshot handed to a later pass never changes underneath it.
pub struct Framebuffer {
    width: usize,
    height: usize,

    color: Vec<Arc<ColorImage>>,
    depth: Option<Image<f32>>,
}

#[derive(Debug, Clone, Copy)]
pub struct ClearValue {
    pub color: Vector4<f32>,
    pub depth: f32,
}

impl Default for ClearValue {
    fn default() -> Self {
        ClearValue {
            color: Vector4::new(0.0, 0.0, 0.0, 1.0),
            depth: 1.0,
        }
    }
}

impl Framebuffer {
    pub fn new(width: usize, height: usize, num_color: usize, has_depth: bool) -> Framebuffer {
        Framebuffer {
            width,
            height,

            color: Vec::from_iter(
                iter::repeat_with(|| Arc::new(Image::new(width, height))).take(num_color),
            ),
            depth: match has_depth {
                true => Some(Image::new(width, height)),
                false => None,
            },
        }
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn color_attachments(&self) -> &[Arc<ColorImage>] {
        &self.color
    }

    /// Shared handle to the current contents of color attachment `index`.
    pub fn color_attachment(&self, index: usize) -> Result<Arc<ColorImage>> {
        self.color
            .get(index)
            .cloned()
            .ok_or(RenderError::MissingAttachment(index))
    }

    pub fn color_attachment_mut(&mut self, index: usize) -> Option<&mut ColorImage> {
        self.color.get_mut(index).map(Arc::make_mut)
    }

    pub fn depth_attachment(&self) -> Option<&Image<f32>> {
        self.depth.as_ref()
    }

    /// Every color attachment plus depth, borrowed mutably at once.
    pub fn attachments_mut(&mut self) -> (Vec<&mut ColorImage>, Option<&mut Image<f32>>) {
        (
            self.color.iter_mut().map(Arc::make_mut).collect(),
            self.depth.as_mut(),
        )
    }

    pub fn clear(&mut self, value: &ClearValue) {
        for attachment in &mut self.color {
            Arc::make_mut(attachment).fill(value.color);
        }

        if let Some(depth) = &mut self.depth {
            depth.fill(value.depth);
        }
    }
}
