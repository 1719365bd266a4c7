//! Host-side errors. The shader stages themselves never fail.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("no render target bound")]
    NoRenderTarget,
    #[error("render target stack underflow")]
    RenderTargetUnderflow,
    #[error("framebuffer lock poisoned")]
    LockPoisoned,
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: usize, vertex_count: usize },
    #[error("no resource bound at set {set}, binding {binding}")]
    UnboundResource { set: u32, binding: u32 },
    #[error("framebuffer has no color attachment {0}")]
    MissingAttachment(usize),
    #[error("invalid target extent {width}x{height}")]
    InvalidExtent { width: usize, height: usize },
    #[error("options io error")]
    Io(#[from] std::io::Error),
    #[error("options parse error: {0}")]
    OptionsParse(String),
}

impl<T> From<std::sync::PoisonError<T>> for RenderError {
    fn from(_value: std::sync::PoisonError<T>) -> Self {
        RenderError::LockPoisoned
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
