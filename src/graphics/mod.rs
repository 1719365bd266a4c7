mod framebuffer;
mod image;
mod scissor;

mod descriptor;
mod rasterizer;
mod sampler;
mod shader;

pub use framebuffer::*;
pub use image::*;
pub use scissor::*;

pub use descriptor::*;
pub use rasterizer::*;
pub use sampler::*;
pub use shader::*;
