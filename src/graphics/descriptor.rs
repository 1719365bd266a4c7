use std::collections::BTreeMap;
use std::sync::Arc;

use super::framebuffer::ColorImage;
use super::sampler::Sampler;
use crate::error::{RenderError, Result};

/// An image paired with the sampler used to read it.
#[derive(Clone)]
pub struct SampledImage {
    pub image: Arc<ColorImage>,
    pub sampler: Sampler,
}

/// Resources bound to one descriptor set, keyed by binding number.
#[derive(Clone, Default)]
pub struct DescriptorSet {
    set: u32,
    images: BTreeMap<u32, SampledImage>,
}

impl DescriptorSet {
    pub fn new(set: u32) -> DescriptorSet {
        DescriptorSet {
            set,
            images: BTreeMap::new(),
        }
    }

    pub fn set(&self) -> u32 {
        self.set
    }

    pub fn bind_image(mut self, binding: u32, image: SampledImage) -> DescriptorSet {
        self.images.insert(binding, image);
        self
    }

    pub fn image(&self, binding: u32) -> Result<&SampledImage> {
        self.images.get(&binding).ok_or(RenderError::UnboundResource {
            set: self.set,
            binding,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::Image;

    #[test]
    fn lookup_reports_set_and_binding() {
        let set = DescriptorSet::new(2);
        match set.image(5) {
            Err(RenderError::UnboundResource { set, binding }) => {
                assert_eq!((set, binding), (2, 5));
            }
            _ => panic!("expected unbound resource"),
        }
    }

    #[test]
    fn bound_image_is_returned() {
        let image = Arc::new(Image::new(1, 1));
        let set = DescriptorSet::new(0).bind_image(
            0,
            SampledImage {
                image: image.clone(),
                sampler: Sampler::default(),
            },
        );

        assert!(Arc::ptr_eq(&set.image(0).unwrap().image, &image));
    }
}
