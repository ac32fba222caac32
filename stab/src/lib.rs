//! Video stabilization core
//!
//! Estimates frame-to-frame camera motion from sparse correspondences,
//! smooths the cumulative trajectory to remove jitter while keeping
//! intentional movement, and re-renders every frame with a corrective
//! affine transform plus a fixed border-compensation zoom.
//!
//! The pipeline is two-pass by construction: the smoothing filter is
//! non-causal, so the whole trajectory must exist before the first frame
//! can be rendered.

pub mod config;
pub mod motion;
pub mod pipeline;
pub mod render;
pub mod trajectory;
pub mod transform;

pub use config::*;
pub use motion::*;
pub use pipeline::*;
pub use render::*;
pub use trajectory::*;
pub use transform::*;

pub type Result<T> = std::result::Result<T, StabError>;

#[derive(Debug, thiserror::Error)]
pub enum StabError {
    #[error("Insufficient correspondences: {0} valid pairs, need at least {1}")]
    InsufficientCorrespondences(usize, usize),

    #[error("Degenerate fit: {0}")]
    DegenerateFit(String),

    #[error("Invalid smoothing radius: {0}")]
    InvalidRadius(String),

    #[error("Length mismatch: {0}")]
    LengthMismatch(String),

    #[error("Render failure: {0}")]
    RenderFailure(String),

    #[error("Tracking lost: {0} consecutive frame pairs failed to fit")]
    TrackingLost(usize),

    #[error("Cancelled at frame {0}")]
    Cancelled(usize),

    #[error("Frame source error: {0}")]
    Source(#[from] vstab_videoio::VideoError),
}

impl StabError {
    /// Failures that degrade a single frame pair instead of ending the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StabError::InsufficientCorrespondences(_, _) | StabError::DegenerateFit(_)
        )
    }
}
