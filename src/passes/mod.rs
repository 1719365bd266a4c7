//! The two render passes of a frame and the contract between them.
//!
//! [`GeometryPass`] transforms meshes into clip space and writes their
//! interpolated vertex color into an offscreen color attachment.
//! [`ResolvePass`] then reads that attachment, bound at set 0 binding 0,
//! and writes it to the final target.

mod geometry;
mod resolve;
mod vertex;

use crate::error::Result;
use crate::graphics::Rasterizer;

pub use geometry::*;
pub use resolve::*;
pub use vertex::*;

pub trait Pass<'a> {
    type Input;
    type Output;

    /// Records and executes the pass. Returns only once all of its work is
    /// visible to whoever consumes the output.
    fn draw(
        &mut self,
        input: Self::Input,
        frame: u64,
        rasterizer: &mut Rasterizer,
    ) -> Result<Self::Output>;
}
