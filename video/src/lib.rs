//! Sparse optical flow and frame-to-frame correspondence tracking
//!
//! Provides the pyramidal Lucas-Kanade tracker and the correspondence
//! provider boundary the stabilization pipeline consumes.

pub mod optical_flow;
pub mod provider;

pub use optical_flow::*;
pub use provider::*;

pub type Result<T> = std::result::Result<T, FlowError>;

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Image size mismatch: {0}")]
    SizeMismatch(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}
