use std::sync::{Arc, Mutex};

use nalgebra::{Vector3, Vector4};

use super::Pass;
use super::vertex::{DrawParams, Vertex};
use crate::error::{RenderError, Result};
use crate::graphics::{
    ClearValue, ColorImage, DepthMode, FragmentContext, Framebuffer, IndexedRenderCall, Pipeline,
    Rasterizer, Shader, VertexContext, VertexOutput, WindingOrder,
};

/// Result of the vertex transform for one vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipSpaceOutput {
    pub position: Vector4<f32>,
    pub color: Vector3<f32>,
}

/// `M * (p, 1)` plus the untouched vertex color. The matrix is not
/// checked; NaN or infinite entries propagate into the output.
pub fn transform(vertex: &Vertex, params: &DrawParams) -> ClipSpaceOutput {
    ClipSpaceOutput {
        position: params.render_matrix() * vertex.position().to_homogeneous(),
        color: vertex.color(),
    }
}

/// Vertex and index buffers shared between draws.
#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: Arc<[Vertex]>,
    indices: Arc<[u16]>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u16>) -> Mesh {
        Mesh {
            vertices: vertices.into(),
            indices: indices.into(),
        }
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn validate(&self) -> Result<()> {
        let vertex_count = self.vertex_count();
        match self.indices.iter().find(|index| **index as usize >= vertex_count) {
            Some(index) => Err(RenderError::IndexOutOfRange {
                index: *index as usize,
                vertex_count,
            }),
            None => Ok(()),
        }
    }
}

/// One mesh drawn with one parameter block.
#[derive(Debug, Clone)]
pub struct MeshDraw {
    pub mesh: Mesh,
    pub params: DrawParams,
}

pub struct DrawBindings {
    pub vertices: Arc<[Vertex]>,
    pub params: DrawParams,
}

#[derive(Debug)]
pub struct TransformShader;

impl Shader for TransformShader {
    type Uniform = DrawBindings;
    type Working = Vector3<f32>;

    fn vertex_stage(&self, context: &VertexContext<Self::Uniform>) -> VertexOutput<Self::Working> {
        let vertex = &context.data.vertices[context.vertex_id];
        let output = transform(vertex, &context.data.params);

        VertexOutput {
            position: output.position,
            data: output.color,
        }
    }

    fn fragment_stage(
        &self,
        context: &FragmentContext<Self::Uniform, Self::Working>,
    ) -> Vector4<f32> {
        context.working.push(1.0)
    }
}

#[derive(Debug, Clone)]
pub struct GeometryPassInfo {
    pub width: usize,
    pub height: usize,

    pub clear: ClearValue,
    pub depth: DepthMode,
    pub cull_back: bool,
    pub winding_order: WindingOrder,
}

pub struct GeometryPass {
    pipeline: Pipeline<TransformShader>,
    target: Arc<Mutex<Framebuffer>>,
    clear: ClearValue,
}

impl GeometryPass {
    pub const COLOR_ATTACHMENT: usize = 0;

    pub fn new(info: &GeometryPassInfo) -> Result<GeometryPass> {
        if info.width == 0 || info.height == 0 {
            return Err(RenderError::InvalidExtent {
                width: info.width,
                height: info.height,
            });
        }

        Ok(GeometryPass {
            pipeline: Pipeline {
                depth: info.depth,
                cull_back: info.cull_back,
                winding_order: info.winding_order,
                shader: TransformShader,
            },
            target: Arc::new(Mutex::new(Framebuffer::new(
                info.width,
                info.height,
                1,
                info.depth != DepthMode::Disabled,
            ))),
            clear: info.clear,
        })
    }

    fn render_draws(&self, draws: &[MeshDraw], rasterizer: &mut Rasterizer) -> Result<()> {
        for draw in draws {
            draw.mesh.validate()?;

            let bindings = DrawBindings {
                vertices: draw.mesh.vertices.clone(),
                params: draw.params,
            };

            rasterizer.render_indexed(&IndexedRenderCall {
                pipeline: &self.pipeline,
                vertex_offset: 0,
                first_instance: 0,
                instance_count: 1,
                scissor: None,
                indices: draw.mesh.indices(),
                data: &bindings,
            })?;
        }

        Ok(())
    }
}

impl<'a> Pass<'a> for GeometryPass {
    type Input = &'a [MeshDraw];
    type Output = Arc<ColorImage>;

    fn draw(
        &mut self,
        input: Self::Input,
        frame: u64,
        rasterizer: &mut Rasterizer,
    ) -> Result<Arc<ColorImage>> {
        log::debug!("frame {}: geometry pass, {} draw(s)", frame, input.len());

        self.target.lock()?.clear(&self.clear);

        rasterizer.push_render_target(self.target.clone());
        let result = self.render_draws(input, rasterizer);
        rasterizer.pop_render_target()?;
        result?;

        self.target.lock()?.color_attachment(Self::COLOR_ATTACHMENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix4, Point3};
    use rand::prelude::*;

    fn random_vector(rng: &mut StdRng) -> Vector3<f32> {
        Vector3::from_fn(|_, _| rng.random_range(-10.0..10.0))
    }

    fn random_vertex(rng: &mut StdRng) -> Vertex {
        Vertex::new(
            Point3::from(random_vector(rng)),
            random_vector(rng),
            random_vector(rng),
        )
    }

    #[test]
    fn identity_scenario() {
        let vertex = Vertex::new(
            Point3::new(1.0, 2.0, 3.0),
            Vector3::zeros(),
            Vector3::new(0.2, 0.4, 0.6),
        );
        let output = transform(&vertex, &DrawParams::default());

        assert_eq!(output.position, Vector4::new(1.0, 2.0, 3.0, 1.0));
        assert_eq!(output.color, Vector3::new(0.2, 0.4, 0.6));
    }

    #[test]
    fn transform_is_matrix_times_homogeneous_position() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..256 {
            let vertex = random_vertex(&mut rng);
            let matrix = Matrix4::from_fn(|_, _| rng.random_range(-4.0..4.0));
            let params = DrawParams::new(random_vector(&mut rng), &matrix);

            let output = transform(&vertex, &params);
            let p = vertex.position;

            for row in 0..4 {
                let expected = matrix[(row, 0)] * p[0]
                    + matrix[(row, 1)] * p[1]
                    + matrix[(row, 2)] * p[2]
                    + matrix[(row, 3)];
                assert!((output.position[row] - expected).abs() <= 1e-3);
            }
        }
    }

    #[test]
    fn color_ignores_everything_else() {
        let mut rng = StdRng::seed_from_u64(11);
        let color = Vector3::new(0.2, 0.4, 0.6);

        for _ in 0..64 {
            let mut vertex = random_vertex(&mut rng);
            vertex.color = color.into();

            let matrix = Matrix4::from_fn(|_, _| rng.random_range(-100.0..100.0));
            let params = DrawParams::new(random_vector(&mut rng), &matrix);
            assert_eq!(transform(&vertex, &params).color, color);
        }
    }

    #[test]
    fn unused_inputs_do_not_affect_position() {
        let vertex = Vertex::new(Point3::new(1.0, -1.0, 0.5), Vector3::x(), Vector3::y());
        let matrix = Matrix4::new_translation(&Vector3::new(0.0, 0.0, 2.0));

        let a = transform(&vertex, &DrawParams::new(Vector3::zeros(), &matrix));
        let b = transform(
            &Vertex {
                normal: [9.0, 9.0, 9.0],
                ..vertex
            },
            &DrawParams::new(Vector3::new(5.0, 6.0, 7.0), &matrix),
        );

        assert_eq!(a.position, b.position);
    }

    #[test]
    fn repeated_invocations_are_bit_identical() {
        let mut rng = StdRng::seed_from_u64(3);
        let vertex = random_vertex(&mut rng);
        let params = DrawParams::new(
            random_vector(&mut rng),
            &Matrix4::from_fn(|_, _| rng.random_range(-1.0..1.0)),
        );

        let first = transform(&vertex, &params);
        for _ in 0..8 {
            let again = transform(&vertex, &params);
            assert_eq!(first.position.map(f32::to_bits), again.position.map(f32::to_bits));
            assert_eq!(first.color.map(f32::to_bits), again.color.map(f32::to_bits));
        }
    }

    #[test]
    fn non_finite_matrix_propagates() {
        let vertex = Vertex::new(Point3::new(1.0, 1.0, 1.0), Vector3::zeros(), Vector3::zeros());
        let mut matrix = Matrix4::identity();
        matrix[(0, 0)] = f32::NAN;

        let output = transform(&vertex, &DrawParams::new(Vector3::zeros(), &matrix));
        assert!(output.position.x.is_nan());
        assert_eq!(output.position.w, 1.0);
    }

    #[test]
    fn mesh_validation_reports_bad_index() {
        let mesh = Mesh::new(vec![Vertex::default(); 3], vec![0, 1, 3]);
        assert!(matches!(
            mesh.validate(),
            Err(RenderError::IndexOutOfRange {
                index: 3,
                vertex_count: 3
            })
        ));
    }

    #[test]
    fn zero_extent_is_rejected() {
        let info = GeometryPassInfo {
            width: 0,
            height: 4,
            clear: ClearValue::default(),
            depth: DepthMode::Write,
            cull_back: true,
            winding_order: WindingOrder::CounterClockwise,
        };
        assert!(matches!(
            GeometryPass::new(&info),
            Err(RenderError::InvalidExtent { width: 0, height: 4 })
        ));
    }
}
