use std::sync::{Arc, Mutex};

use nalgebra::{Point2, Point3, Vector4};

use super::Pass;
use crate::error::{RenderError, Result};
use crate::graphics::{
    ClearValue, ColorImage, DepthMode, DescriptorSet, FragmentContext, Framebuffer,
    IndexedRenderCall, Pipeline, Rasterizer, SampledImage, Shader, VertexContext, VertexOutput,
    WindingOrder,
};

/// Samples the bound image at the pixel being shaded and returns the
/// sample as is. No exposure, curve or gamma is applied; this is where a
/// tonemapping operator would go.
///
/// Coordinates outside the image are handled by the sampler's wrap mode.
pub fn resolve(
    input: &SampledImage,
    frag_coord: &Point3<f32>,
    target_size: (usize, usize),
) -> Vector4<f32> {
    let (width, height) = target_size;
    let uv = Point2::new(frag_coord.x / width as f32, frag_coord.y / height as f32);

    input.sampler.sample(&input.image, uv)
}

// one oversized triangle covering the whole of clip space
const FULLSCREEN_TRIANGLE: [[f32; 2]; 3] = [[-1.0, -1.0], [-1.0, 3.0], [3.0, -1.0]];
const FULLSCREEN_INDICES: [u16; 3] = [0, 1, 2];

#[derive(Debug)]
pub struct ResolveShader;

impl Shader for ResolveShader {
    type Uniform = SampledImage;
    type Working = ();

    fn vertex_stage(&self, context: &VertexContext<Self::Uniform>) -> VertexOutput<Self::Working> {
        let [x, y] = FULLSCREEN_TRIANGLE[context.vertex_id % FULLSCREEN_TRIANGLE.len()];

        VertexOutput {
            position: Vector4::new(x, y, 0.0, 1.0),
            data: (),
        }
    }

    fn fragment_stage(
        &self,
        context: &FragmentContext<Self::Uniform, Self::Working>,
    ) -> Vector4<f32> {
        resolve(context.data, &context.frag_coord, context.target_size)
    }
}

pub struct ResolvePass {
    pipeline: Pipeline<ResolveShader>,
    target: Arc<Mutex<Framebuffer>>,
    clear: ClearValue,
}

impl ResolvePass {
    pub const INPUT_SET: u32 = 0;
    pub const INPUT_BINDING: u32 = 0;
    pub const COLOR_ATTACHMENT: usize = 0;

    pub fn new(width: usize, height: usize, clear_color: Vector4<f32>) -> Result<ResolvePass> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidExtent { width, height });
        }

        Ok(ResolvePass {
            pipeline: Pipeline {
                depth: DepthMode::Disabled,
                cull_back: false,
                winding_order: WindingOrder::CounterClockwise,
                shader: ResolveShader,
            },
            target: Arc::new(Mutex::new(Framebuffer::new(width, height, 1, false))),
            clear: ClearValue {
                color: clear_color,
                depth: 1.0,
            },
        })
    }
}

impl<'a> Pass<'a> for ResolvePass {
    type Input = &'a DescriptorSet;
    type Output = Arc<ColorImage>;

    fn draw(
        &mut self,
        input: Self::Input,
        frame: u64,
        rasterizer: &mut Rasterizer,
    ) -> Result<Arc<ColorImage>> {
        if input.set() != Self::INPUT_SET {
            return Err(RenderError::UnboundResource {
                set: Self::INPUT_SET,
                binding: Self::INPUT_BINDING,
            });
        }

        let image = input.image(Self::INPUT_BINDING)?;
        log::debug!(
            "frame {}: resolve pass, input {:?}",
            frame,
            image.image.size()
        );

        self.target.lock()?.clear(&self.clear);

        rasterizer.push_render_target(self.target.clone());
        let result = rasterizer.render_indexed(&IndexedRenderCall {
            pipeline: &self.pipeline,
            vertex_offset: 0,
            first_instance: 0,
            instance_count: 1,
            scissor: None,
            indices: &FULLSCREEN_INDICES,
            data: image,
        });
        rasterizer.pop_render_target()?;
        result?;

        self.target.lock()?.color_attachment(Self::COLOR_ATTACHMENT)
    }
}
