use nalgebra::{Point3, Vector3, Vector4};

pub struct VertexContext<'a, U> {
    pub vertex_id: usize,
    pub instance_id: usize,
    pub data: &'a U,
}

pub struct FragmentContext<'a, U, W> {
    pub instance_id: usize,

    /// Pixel center in framebuffer space, z is the interpolated depth.
    pub frag_coord: Point3<f32>,
    /// Size of the render target being shaded.
    pub target_size: (usize, usize),

    pub data: &'a U,
    pub working: W,
}

pub struct VertexOutput<W> {
    /// Homogeneous clip-space position. The rasterizer divides by w.
    pub position: Vector4<f32>,
    pub data: W,
}

/// Per-vertex data that can be interpolated across a face. Weights are
/// already perspective-corrected and sum to one.
pub trait Blendable {
    fn blend(data: &[&Self], weights: &[f32]) -> Self;
}

impl Blendable for () {
    fn blend(_data: &[&Self], _weights: &[f32]) -> Self {}
}

impl Blendable for f32 {
    fn blend(data: &[&Self], weights: &[f32]) -> Self {
        data.iter().zip(weights).map(|(value, weight)| **value * weight).sum()
    }
}

impl Blendable for Vector3<f32> {
    fn blend(data: &[&Self], weights: &[f32]) -> Self {
        data.iter()
            .zip(weights)
            .fold(Vector3::zeros(), |acc, (value, weight)| acc + **value * *weight)
    }
}

impl Blendable for Vector4<f32> {
    fn blend(data: &[&Self], weights: &[f32]) -> Self {
        data.iter()
            .zip(weights)
            .fold(Vector4::zeros(), |acc, (value, weight)| acc + **value * *weight)
    }
}

/// A pair of programmable stages. Both are invoked concurrently from many
/// threads and must not depend on invocation order.
pub trait Shader {
    type Uniform: Sync;
    type Working: Blendable + Send + Sync;

    fn vertex_stage(&self, context: &VertexContext<Self::Uniform>) -> VertexOutput<Self::Working>;
    fn fragment_stage(&self, context: &FragmentContext<Self::Uniform, Self::Working>)
    -> Vector4<f32>;
}
