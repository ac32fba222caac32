//! Two-pass stabilization pipeline
//!
//! Pass 1 walks the source once, estimating a motion delta per consecutive
//! frame pair. Pass 2 smooths the accumulated trajectory, rebuilds the
//! corrective matrices, seeks the source back to frame 0, and renders.
//!
//! The smoothing filter is non-causal; pass 1 must complete before any
//! frame can be rendered.

use crate::{
    reconstruct, FrameRenderer, MotionDelta, MotionEstimator, Result, StabConfig, StabError,
    Trajectory,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vstab_core::{pair_valid, rgb_to_gray};
use vstab_features::GfttParams;
use vstab_video::{CorrespondenceProvider, GfttLkProvider, LucasKanade};
use vstab_videoio::{FrameSink, FrameSource};

/// Pipeline progress, advanced only by [`Stabilizer::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    EstimatingMotion,
    TrajectoryComplete,
    Smoothing,
    Rendering,
    Done,
    Failed,
}

/// Outcome summary reported to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StabilizationReport {
    /// Frames read from the source during pass 1.
    pub total_frames: usize,
    /// Frames rendered and written during pass 2.
    pub stabilized_frames: usize,
    /// Frame pairs where estimation failed and the previous delta was held.
    pub degraded_frames: usize,
}

/// Cooperative cancellation flag, checked once per frame iteration.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The full stabilization pipeline over a correspondence provider.
pub struct Stabilizer<P: CorrespondenceProvider> {
    config: StabConfig,
    provider: P,
    estimator: MotionEstimator,
    renderer: FrameRenderer,
    state: PipelineState,
}

impl Stabilizer<GfttLkProvider> {
    /// Stabilizer with the built-in provider: Shi-Tomasi seeding re-run on
    /// every frame, tracked by pyramidal Lucas-Kanade.
    pub fn new(config: StabConfig) -> Self {
        let detector = GfttParams {
            max_corners: config.max_tracked_points,
            quality_level: config.quality_level,
            min_distance: config.min_point_separation,
            ..GfttParams::default()
        };
        let provider = GfttLkProvider::new(detector, LucasKanade::default());
        Self::with_provider(config, provider)
    }
}

impl<P: CorrespondenceProvider> Stabilizer<P> {
    pub fn with_provider(config: StabConfig, provider: P) -> Self {
        let estimator = MotionEstimator::new()
            .with_min_points(config.min_tracked_points)
            .with_robust(config.robust.clone());
        let renderer = FrameRenderer::new(config.border_zoom);

        Self {
            config,
            provider,
            estimator,
            renderer,
            state: PipelineState::Init,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Run the full two-pass pipeline from `source` into `sink`.
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
    ) -> Result<StabilizationReport> {
        self.run_with_cancel(source, sink, &CancelToken::new())
    }

    /// Like [`Stabilizer::run`], with a cancellation flag checked once per
    /// frame iteration. Cancellation never leaves a partially written
    /// frame: the check happens between frames, and the sink is closed
    /// before returning.
    pub fn run_with_cancel(
        &mut self,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
        cancel: &CancelToken,
    ) -> Result<StabilizationReport> {
        let mut report = StabilizationReport::default();
        match self.run_inner(source, sink, cancel, &mut report) {
            Ok(()) => Ok(report),
            Err(e) => {
                self.transition(PipelineState::Failed);
                // Flush whatever was already written before surfacing.
                let _ = sink.close();
                warn!(
                    total = report.total_frames,
                    stabilized = report.stabilized_frames,
                    degraded = report.degraded_frames,
                    "stabilization halted: {e}"
                );
                Err(e)
            }
        }
    }

    fn run_inner(
        &mut self,
        source: &mut dyn FrameSource,
        sink: &mut dyn FrameSink,
        cancel: &CancelToken,
        report: &mut StabilizationReport,
    ) -> Result<()> {
        self.transition(PipelineState::EstimatingMotion);
        let deltas = self.estimate_pass(source, cancel, report)?;
        self.transition(PipelineState::TrajectoryComplete);

        if deltas.is_empty() {
            // Zero or one frame: nothing to stabilize, valid run.
            self.transition(PipelineState::Done);
            sink.close()?;
            return Ok(());
        }

        self.transition(PipelineState::Smoothing);
        let raw = Trajectory::accumulate(&deltas);
        let smoothed = raw.smooth(self.config.smoothing_radius)?;
        let matrices = reconstruct(&raw, &smoothed, &deltas)?;

        self.transition(PipelineState::Rendering);
        let size = (source.width(), source.height());
        source.seek(0)?;

        for (frame_idx, matrix) in matrices.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(StabError::Cancelled(frame_idx));
            }

            let Some(frame) = source.next_frame()? else {
                warn!(frame_idx, "source ended early during render pass");
                break;
            };

            let stabilized = self.renderer.render(&frame, matrix, size)?;
            sink.write_frame(&stabilized)?;
            report.stabilized_frames += 1;
        }

        sink.close()?;
        self.transition(PipelineState::Done);
        info!(
            total = report.total_frames,
            stabilized = report.stabilized_frames,
            degraded = report.degraded_frames,
            "stabilization finished"
        );
        Ok(())
    }

    /// Pass 1: one motion delta per consecutive frame pair.
    ///
    /// A frame pair whose fit fails recoverably holds the previous valid
    /// delta (zero extra motion); `max_consecutive_failures` such pairs in
    /// a row escalate to `TrackingLost`. An early end of stream is normal
    /// termination, not an error.
    fn estimate_pass(
        &mut self,
        source: &mut dyn FrameSource,
        cancel: &CancelToken,
        report: &mut StabilizationReport,
    ) -> Result<Vec<MotionDelta>> {
        let mut deltas = Vec::new();

        let Some(first) = source.next_frame()? else {
            return Ok(deltas);
        };
        report.total_frames = 1;
        let mut prev_gray = rgb_to_gray(&first);

        let mut last_delta = MotionDelta::zero();
        let mut consecutive_failures = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Err(StabError::Cancelled(report.total_frames));
            }

            let Some(frame) = source.next_frame()? else {
                break;
            };
            report.total_frames += 1;
            let curr_gray = rgb_to_gray(&frame);

            // Re-seed every frame; tracked features are not carried across
            // pairs.
            let seeds = self.provider.detect_seed_points(&prev_gray);
            let tracked = self.provider.track(&prev_gray, &curr_gray, &seeds);
            let pairs = pair_valid(&seeds, &tracked);

            match self.estimator.estimate(&pairs) {
                Ok(delta) => {
                    consecutive_failures = 0;
                    last_delta = delta;
                    deltas.push(delta);
                }
                Err(e) if e.is_recoverable() => {
                    consecutive_failures += 1;
                    report.degraded_frames += 1;
                    warn!(
                        frame = report.total_frames - 1,
                        consecutive = consecutive_failures,
                        "motion fit failed ({e}); holding previous delta"
                    );
                    if consecutive_failures >= self.config.max_consecutive_failures {
                        return Err(StabError::TrackingLost(consecutive_failures));
                    }
                    deltas.push(last_delta);
                }
                Err(e) => return Err(e),
            }

            prev_gray = curr_gray;
        }

        Ok(deltas)
    }

    fn transition(&mut self, next: PipelineState) {
        debug!(from = ?self.state, to = ?next, "pipeline state");
        self.state = next;
    }
}
