//! Geometric image transforms
//!
//! Affine warping with inverse mapping, used by the stabilization renderer
//! to apply corrective transforms and the border-compensation zoom.

pub mod geometry;

pub use geometry::*;

pub type Result<T> = std::result::Result<T, ImgprocError>;

#[derive(Debug, thiserror::Error)]
pub enum ImgprocError {
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Degenerate transform: {0}")]
    DegenerateTransform(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderMode {
    /// Out-of-image samples read as a constant value (per channel).
    Constant(u8),
    /// Out-of-image samples clamp to the nearest edge pixel.
    Replicate,
}

pub fn validate_image_size(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(ImgprocError::DimensionMismatch(
            "Image dimensions must be non-zero".into(),
        ));
    }
    Ok(())
}
