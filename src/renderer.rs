use std::sync::Arc;

use nalgebra::Vector4;

use crate::error::Result;
use crate::graphics::{ColorImage, DescriptorSet, Rasterizer, RenderStats, SampledImage, Sampler};
use crate::options::RenderOptions;
use crate::passes::{GeometryPass, MeshDraw, Pass, ResolvePass};

/// Runs the geometry pass and then the resolve pass, once per frame.
pub struct Renderer {
    options: RenderOptions,
    rasterizer: Rasterizer,

    geometry: GeometryPass,
    resolve: ResolvePass,
    sampler: Sampler,

    frame: u64,
    last_stats: RenderStats,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Result<Renderer> {
        let geometry = GeometryPass::new(&options.geometry_pass_info())?;
        let resolve = ResolvePass::new(
            options.target.width,
            options.target.height,
            Vector4::from(options.resolve.clear_color),
        )?;

        log::info!(
            "renderer created at {}x{}",
            options.target.width,
            options.target.height
        );

        Ok(Renderer {
            sampler: options.resolve.sampler(),
            options,
            rasterizer: Rasterizer::new(),
            geometry,
            resolve,
            frame: 0,
            last_stats: RenderStats::default(),
        })
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Statistics of the last completed frame.
    pub fn stats(&self) -> RenderStats {
        self.last_stats
    }

    /// Rebuilds both targets. Images handed out earlier stay valid.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<()> {
        let mut options = self.options.clone();
        options.target.width = width;
        options.target.height = height;

        let geometry = GeometryPass::new(&options.geometry_pass_info())?;
        let resolve = ResolvePass::new(width, height, Vector4::from(options.resolve.clear_color))?;

        log::debug!("resized targets to {}x{}", width, height);

        self.geometry = geometry;
        self.resolve = resolve;
        self.options = options;
        Ok(())
    }

    pub fn render_frame(&mut self, draws: &[MeshDraw]) -> Result<Arc<ColorImage>> {
        self.rasterizer.new_frame();

        let scene = self.geometry.draw(draws, self.frame, &mut self.rasterizer)?;

        // the geometry pass has fully completed; `scene` is immutable from here on
        let bindings = DescriptorSet::new(ResolvePass::INPUT_SET).bind_image(
            ResolvePass::INPUT_BINDING,
            SampledImage {
                image: scene,
                sampler: self.sampler,
            },
        );

        let output = self.resolve.draw(&bindings, self.frame, &mut self.rasterizer)?;

        self.last_stats = self.rasterizer.stats();
        log::debug!("frame {} done: {:?}", self.frame, self.last_stats);

        self.frame += 1;
        Ok(output)
    }
}
