use std::array;
use std::sync::{Arc, Mutex};

use nalgebra::{Matrix2, Point2, Point3, Vector4};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::framebuffer::Framebuffer;
use super::scissor::Scissor;
use super::shader::{Blendable, FragmentContext, Shader, VertexContext, VertexOutput};
use crate::error::{RenderError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthMode {
    /// No depth test, depth attachment untouched.
    #[default]
    Disabled,
    /// Fragments must be strictly closer than the stored depth.
    Test,
    /// Test, then store the fragment depth.
    Write,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindingOrder {
    Clockwise,
    #[default]
    CounterClockwise,
}

#[derive(Debug)]
pub struct Pipeline<T: Shader> {
    pub depth: DepthMode,

    pub cull_back: bool,
    pub winding_order: WindingOrder,

    pub shader: T,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub calls: usize,
    pub instances: usize,
    pub vertices_shaded: usize,
    pub faces_processed: usize,
    pub faces_rendered: usize,
    pub fragments_shaded: usize,
}

pub struct Rasterizer {
    targets: Vec<Arc<Mutex<Framebuffer>>>,
    stats: RenderStats,
}

pub struct IndexedRenderCall<'a, T: Shader> {
    pub pipeline: &'a Pipeline<T>,

    pub vertex_offset: usize,
    pub first_instance: usize,
    pub instance_count: usize,

    pub scissor: Option<Scissor>,

    pub indices: &'a [u16],
    pub data: &'a T::Uniform,
}

pub fn gen_scissor(uv: &[Point2<f32>], max_width: usize, max_height: usize) -> Scissor {
    let mut x0 = max_width;
    let mut y0 = max_height;

    let mut x1: usize = 0;
    let mut y1: usize = 0;

    for point in uv {
        let x = point.x.clamp(0.0, 1.0) * max_width as f32;
        let y = point.y.clamp(0.0, 1.0) * max_height as f32;

        x0 = (x.floor() as usize).min(x0);
        y0 = (y.floor() as usize).min(y0);

        x1 = (x.ceil() as usize).max(x1);
        y1 = (y.ceil() as usize).max(y1);
    }

    Scissor {
        x: x0,
        y: y0,
        width: x1.saturating_sub(x0),
        height: y1.saturating_sub(y0),
    }
}

fn signed_triangle_area(points: [&Point2<f32>; 3], winding: WindingOrder) -> f32 {
    let a = points[0];
    let b = points[1];
    let c = points[2];

    let mat = match winding {
        // rotate counterclockwise 90 deg
        WindingOrder::CounterClockwise => Matrix2::new(0.0, 1.0, -1.0, 0.0),

        // rotate clockwise 90 deg
        WindingOrder::Clockwise => Matrix2::new(0.0, -1.0, 1.0, 0.0),
    };

    let ab = b - a;
    let ac = c - a;

    let normal = mat * ab;
    ac.dot(&normal) / 2.0
}

pub const VERTICES_PER_FACE: usize = 3;

/// Clip-space w at or below this is treated as behind the eye.
const MIN_CLIP_W: f32 = 1e-6;

/// A face after perspective division.
struct ScreenFace {
    ndc: [Point3<f32>; VERTICES_PER_FACE],
    inverse_w: [f32; VERTICES_PER_FACE],
    /// +1 for front-facing, -1 for back-facing.
    orientation: f32,
}

struct FragmentInfo {
    depth: f32,
    weights: [f32; VERTICES_PER_FACE],
}

struct Fragment {
    x: usize,
    y: usize,
    depth: f32,
    color: Vector4<f32>,
}

fn project_face<W>(
    vertices: [&VertexOutput<W>; VERTICES_PER_FACE],
    winding: WindingOrder,
    cull_back: bool,
) -> Option<ScreenFace> {
    // no clipping: faces crossing the w = 0 plane are dropped whole
    if vertices.iter().any(|v| !(v.position.w > MIN_CLIP_W)) {
        return None;
    }

    let inverse_w = vertices.map(|v| 1.0 / v.position.w);
    let ndc = array::from_fn(|i| Point3::from(vertices[i].position.xyz() * inverse_w[i]));

    let screen_points: [Point2<f32>; VERTICES_PER_FACE] = ndc.each_ref().map(|p| p.xy());
    let area = signed_triangle_area(
        [&screen_points[0], &screen_points[1], &screen_points[2]],
        winding,
    );

    if !area.is_finite() || area == 0.0 {
        return None;
    }

    if cull_back && area < 0.0 {
        return None;
    }

    Some(ScreenFace {
        ndc,
        inverse_w,
        orientation: area.signum(),
    })
}

fn process_fragment_geometry(
    face: &ScreenFace,
    point: &Point2<f32>,
    winding: WindingOrder,
) -> Option<FragmentInfo> {
    let screen_points = face.ndc.each_ref().map(|p| p.xy());
    let areas = array::from_fn::<_, VERTICES_PER_FACE, _>(|i| {
        let a = &screen_points[(i + 1) % VERTICES_PER_FACE];
        let b = &screen_points[(i + 2) % VERTICES_PER_FACE];

        signed_triangle_area([a, b, point], winding)
    });

    // edges are inclusive on both sides
    if !areas.iter().all(|area| area * face.orientation >= 0.0) {
        return None;
    }

    let area_sum = areas.iter().sum::<f32>();
    let flat_weights = areas.map(|area| area / area_sum);

    let depth = (0..VERTICES_PER_FACE)
        .map(|i| flat_weights[i] * face.ndc[i].z)
        .sum::<f32>();

    let corrected =
        array::from_fn::<_, VERTICES_PER_FACE, _>(|i| flat_weights[i] * face.inverse_w[i]);
    let corrected_sum = corrected.iter().sum::<f32>();

    Some(FragmentInfo {
        depth,
        weights: corrected.map(|weight| weight / corrected_sum),
    })
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer {
    pub fn new() -> Rasterizer {
        Rasterizer {
            targets: Vec::new(),
            stats: RenderStats::default(),
        }
    }

    pub fn new_frame(&mut self) {
        if !self.targets.is_empty() {
            log::warn!(
                "{} render target(s) still bound at frame start, unbinding",
                self.targets.len()
            );
            self.targets.clear();
        }

        self.stats = RenderStats::default();
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    pub fn push_render_target(&mut self, target: Arc<Mutex<Framebuffer>>) {
        self.targets.push(target);
    }

    pub fn pop_render_target(&mut self) -> Result<Arc<Mutex<Framebuffer>>> {
        self.targets.pop().ok_or(RenderError::RenderTargetUnderflow)
    }

    fn shade_face<T: Shader + Sync>(
        &self,
        instance_id: usize,
        call: &IndexedRenderCall<T>,
        vertices: [&VertexOutput<T::Working>; VERTICES_PER_FACE],
        fb_width: usize,
        fb_height: usize,
    ) -> Option<Vec<Fragment>> {
        let pipeline = call.pipeline;
        let face = project_face(vertices, pipeline.winding_order, pipeline.cull_back)?;

        let uv = face
            .ndc
            .each_ref()
            .map(|p| p.xy().map(|x| (x + 1.0) / 2.0));

        let generated_scissor = gen_scissor(&uv, fb_width, fb_height);
        let final_scissor = match &call.scissor {
            Some(user_scissor) => generated_scissor.intersect_with(user_scissor)?,
            None => generated_scissor,
        };

        let working = vertices.map(|v| &v.data);
        let fragments = final_scissor
            .coordinates()
            .par_bridge()
            .filter_map(|(x, y)| {
                let point = Point2::new(
                    (((x as f32 + 0.5) / fb_width as f32) * 2.0) - 1.0,
                    (((y as f32 + 0.5) / fb_height as f32) * 2.0) - 1.0,
                );

                let frag = process_fragment_geometry(&face, &point, pipeline.winding_order)?;
                let color = pipeline.shader.fragment_stage(&FragmentContext {
                    instance_id,
                    frag_coord: Point3::new(x as f32 + 0.5, y as f32 + 0.5, frag.depth),
                    target_size: (fb_width, fb_height),
                    data: call.data,
                    working: <T::Working as Blendable>::blend(&working, &frag.weights),
                });

                Some(Fragment {
                    x,
                    y,
                    depth: frag.depth,
                    color,
                })
            })
            .collect();

        Some(fragments)
    }

    fn write_fragments(
        framebuffer: &mut Framebuffer,
        depth_mode: DepthMode,
        fragments: &[Fragment],
    ) {
        let (mut colors, mut depth) = framebuffer.attachments_mut();

        for fragment in fragments {
            if depth_mode != DepthMode::Disabled {
                if let Some(depth) = depth.as_deref_mut() {
                    match depth.at(fragment.x, fragment.y) {
                        Some(current) if fragment.depth < *current => {}
                        _ => continue,
                    }

                    if depth_mode == DepthMode::Write {
                        depth.exchange(fragment.x, fragment.y, fragment.depth);
                    }
                }
            }

            for attachment in colors.iter_mut() {
                attachment.exchange(fragment.x, fragment.y, fragment.color);
            }
        }
    }

    /// Runs the vertex stage over every referenced vertex, then rasterizes
    /// faces in index order. Returns once every invocation has finished and
    /// its results are in the bound render target.
    pub fn render_indexed<T: Shader + Sync>(&mut self, call: &IndexedRenderCall<T>) -> Result<()> {
        let target = self.targets.last().ok_or(RenderError::NoRenderTarget)?.clone();
        let (fb_width, fb_height) = target.lock()?.size();

        if call.indices.len() % VERTICES_PER_FACE != 0 {
            log::warn!(
                "{} trailing indices ignored",
                call.indices.len() % VERTICES_PER_FACE
            );
        }

        let vertex_count = call
            .indices
            .iter()
            .max()
            .map_or(0, |index| *index as usize + 1);

        log::debug!(
            "render_indexed: {} indices, {} vertices, {} instance(s) into {}x{}",
            call.indices.len(),
            vertex_count,
            call.instance_count,
            fb_width,
            fb_height
        );

        self.stats.calls += 1;
        for i in 0..call.instance_count {
            let instance_id = call.first_instance + i;

            let vertex_output: Vec<VertexOutput<T::Working>> = (0..vertex_count)
                .into_par_iter()
                .map(|index| {
                    call.pipeline.shader.vertex_stage(&VertexContext {
                        vertex_id: call.vertex_offset + index,
                        instance_id,
                        data: call.data,
                    })
                })
                .collect();

            self.stats.instances += 1;
            self.stats.vertices_shaded += vertex_count;

            for face in call.indices.chunks_exact(VERTICES_PER_FACE) {
                self.stats.faces_processed += 1;

                let vertices = array::from_fn(|j| &vertex_output[face[j] as usize]);
                let shaded = self.shade_face(instance_id, call, vertices, fb_width, fb_height);
                let Some(fragments) = shaded else {
                    log::trace!("face {:?} rejected", face);
                    continue;
                };

                self.stats.faces_rendered += 1;
                self.stats.fragments_shaded += fragments.len();

                let mut fb = target.lock()?;
                Self::write_fragments(&mut fb, call.pipeline.depth, &fragments);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::ClearValue;
    use nalgebra::Vector3;

    struct FlatShader;

    struct FlatUniform {
        positions: Vec<Vector4<f32>>,
        colors: Vec<Vector3<f32>>,
    }

    impl Shader for FlatShader {
        type Uniform = FlatUniform;
        type Working = Vector3<f32>;

        fn vertex_stage(
            &self,
            context: &VertexContext<Self::Uniform>,
        ) -> VertexOutput<Self::Working> {
            VertexOutput {
                position: context.data.positions[context.vertex_id],
                data: context.data.colors[context.vertex_id],
            }
        }

        fn fragment_stage(
            &self,
            context: &FragmentContext<Self::Uniform, Self::Working>,
        ) -> Vector4<f32> {
            context.working.push(1.0)
        }
    }

    fn assert_color(actual: Option<&Vector4<f32>>, expected: Vector4<f32>) {
        let actual = actual.unwrap();
        assert!((actual - expected).amax() < 1e-5, "{actual:?} != {expected:?}");
    }

    fn pipeline(depth: DepthMode, cull_back: bool) -> Pipeline<FlatShader> {
        Pipeline {
            depth,
            cull_back,
            winding_order: WindingOrder::CounterClockwise,
            shader: FlatShader,
        }
    }

    fn target(width: usize, height: usize) -> Arc<Mutex<Framebuffer>> {
        let mut fb = Framebuffer::new(width, height, 1, true);
        fb.clear(&ClearValue {
            color: Vector4::zeros(),
            depth: 1.0,
        });
        Arc::new(Mutex::new(fb))
    }

    fn uniform(positions: &[[f32; 4]], color: [f32; 3]) -> FlatUniform {
        FlatUniform {
            positions: positions.iter().map(|p| Vector4::from(*p)).collect(),
            colors: vec![Vector3::from(color); positions.len()],
        }
    }

    fn draw(
        rast: &mut Rasterizer,
        pipeline: &Pipeline<FlatShader>,
        indices: &[u16],
        data: &FlatUniform,
    ) -> Result<()> {
        rast.render_indexed(&IndexedRenderCall {
            pipeline,
            vertex_offset: 0,
            first_instance: 0,
            instance_count: 1,
            scissor: None,
            indices,
            data,
        })
    }

    // counterclockwise with y pointing down
    const QUAD_HALF: [[f32; 4]; 3] = [
        [-1.0, -1.0, 0.5, 1.0],
        [-1.0, 1.0, 0.5, 1.0],
        [1.0, 1.0, 0.5, 1.0],
    ];

    #[test]
    fn draw_without_target_fails() {
        let mut rast = Rasterizer::new();
        let data = uniform(&QUAD_HALF, [1.0, 0.0, 0.0]);
        assert!(matches!(
            draw(&mut rast, &pipeline(DepthMode::Disabled, false), &[0, 1, 2], &data),
            Err(RenderError::NoRenderTarget)
        ));
        assert!(matches!(
            rast.pop_render_target(),
            Err(RenderError::RenderTargetUnderflow)
        ));
    }

    #[test]
    fn triangle_covers_lower_left_half() {
        let mut rast = Rasterizer::new();
        let fb = target(8, 8);
        rast.push_render_target(fb.clone());

        let data = uniform(&QUAD_HALF, [1.0, 0.0, 0.0]);
        draw(&mut rast, &pipeline(DepthMode::Disabled, true), &[0, 1, 2], &data).unwrap();
        rast.pop_render_target().unwrap();

        let fb = fb.lock().unwrap();
        let color = fb.color_attachment(0).unwrap();
        let red = Vector4::new(1.0, 0.0, 0.0, 1.0);

        assert_color(color.at(0, 7), red);
        assert_eq!(color.at(7, 0), Some(&Vector4::zeros()));

        let stats = rast.stats();
        assert_eq!(stats.calls, 1);
        assert_eq!(stats.faces_rendered, 1);
        assert_eq!(stats.vertices_shaded, 3);
        // 28 pixels strictly below the diagonal plus 8 on it
        assert_eq!(stats.fragments_shaded, 36);
    }

    #[test]
    fn back_faces_are_culled() {
        let mut rast = Rasterizer::new();
        let fb = target(4, 4);
        rast.push_render_target(fb.clone());

        let data = uniform(&QUAD_HALF, [1.0, 0.0, 0.0]);
        draw(&mut rast, &pipeline(DepthMode::Disabled, true), &[0, 2, 1], &data).unwrap();
        assert_eq!(rast.stats().faces_rendered, 0);

        draw(&mut rast, &pipeline(DepthMode::Disabled, false), &[0, 2, 1], &data).unwrap();
        assert_eq!(rast.stats().faces_rendered, 1);
    }

    #[test]
    fn depth_test_keeps_nearest() {
        let mut rast = Rasterizer::new();
        let fb = target(4, 4);
        rast.push_render_target(fb.clone());
        let pipeline = pipeline(DepthMode::Write, false);

        let near = uniform(
            &QUAD_HALF.map(|mut p| {
                p[2] = 0.2;
                p
            }),
            [0.0, 1.0, 0.0],
        );
        let far = uniform(&QUAD_HALF, [1.0, 0.0, 0.0]);

        draw(&mut rast, &pipeline, &[0, 1, 2], &near).unwrap();
        draw(&mut rast, &pipeline, &[0, 1, 2], &far).unwrap();

        let fb = fb.lock().unwrap();
        assert_color(
            fb.color_attachment(0).unwrap().at(0, 3),
            Vector4::new(0.0, 1.0, 0.0, 1.0),
        );
        let depth = *fb.depth_attachment().unwrap().at(0, 3).unwrap();
        assert!((depth - 0.2).abs() < 1e-6);
    }

    #[test]
    fn faces_behind_the_eye_are_dropped() {
        let mut rast = Rasterizer::new();
        rast.push_render_target(target(4, 4));

        let mut positions = QUAD_HALF;
        positions[1][3] = -1.0;
        let data = uniform(&positions, [1.0, 1.0, 1.0]);

        draw(&mut rast, &pipeline(DepthMode::Disabled, false), &[0, 1, 2], &data).unwrap();
        assert_eq!(rast.stats().faces_processed, 1);
        assert_eq!(rast.stats().faces_rendered, 0);
    }

    #[test]
    fn interpolation_is_perspective_correct() {
        let shader_data = FlatUniform {
            // same screen triangle, the first vertex pushed twice as far
            positions: vec![
                Vector4::new(-2.0, -2.0, 1.0, 2.0),
                Vector4::new(-1.0, 1.0, 0.5, 1.0),
                Vector4::new(1.0, 1.0, 0.5, 1.0),
            ],
            colors: vec![
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
                Vector3::new(0.0, 0.0, 1.0),
            ],
        };

        let face = project_face(
            [
                &VertexOutput {
                    position: shader_data.positions[0],
                    data: (),
                },
                &VertexOutput {
                    position: shader_data.positions[1],
                    data: (),
                },
                &VertexOutput {
                    position: shader_data.positions[2],
                    data: (),
                },
            ],
            WindingOrder::CounterClockwise,
            true,
        )
        .unwrap();

        // screen-space midpoint of the edge between vertex 0 and vertex 1
        let point = Point2::new(-1.0, 0.0);
        let info =
            process_fragment_geometry(&face, &point, WindingOrder::CounterClockwise).unwrap();

        // 1/w weighting pulls the sample toward the nearer vertex
        assert!((info.weights[0] - 1.0 / 3.0).abs() < 1e-5);
        assert!((info.weights[1] - 2.0 / 3.0).abs() < 1e-5);
        assert!(info.weights[2].abs() < 1e-5);
    }

    #[test]
    fn gen_scissor_clamps_to_target() {
        let uv = [
            Point2::new(-1.0, 0.25),
            Point2::new(2.0, 0.25),
            Point2::new(0.5, 0.75),
        ];
        assert_eq!(
            gen_scissor(&uv, 8, 8),
            Scissor {
                x: 0,
                y: 2,
                width: 8,
                height: 4
            }
        );
    }
}
