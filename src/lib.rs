pub mod color;
pub mod error;
pub mod graphics;
pub mod options;
pub mod passes;
pub mod renderer;

pub use error::{RenderError, Result};
