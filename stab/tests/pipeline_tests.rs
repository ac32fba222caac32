use image::{Rgb, RgbImage};
use nalgebra::Point2;
use std::cell::RefCell;
use vstab_core::{KeyPoint, KeyPoints, RobustConfig, TrackedPoint};
use vstab_stab::{
    reconstruct, CancelToken, MotionDelta, PipelineState, StabConfig, StabError, StabilizationReport,
    Stabilizer, Trajectory,
};
use vstab_video::CorrespondenceProvider;
use vstab_videoio::backends::{MemorySink, MemorySource};
use vstab_videoio::FrameSink;

/// Checkerboard shifted by an integer camera offset.
fn checker_frame(width: u32, height: u32, shift: (i64, i64)) -> RgbImage {
    let mut img = RgbImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let cx = (x as i64 - shift.0).div_euclid(12);
            let cy = (y as i64 - shift.1).div_euclid(12);
            let v = if (cx + cy).rem_euclid(2) == 0 { 235 } else { 20 };
            img.put_pixel(x, y, Rgb([v, v, v]));
        }
    }
    img
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    (mean, var.sqrt())
}

#[test]
fn trajectory_chain_removes_jitter_and_keeps_true_motion() {
    // 100-frame sequence: +1 px/frame true motion with alternating +/-2 px
    // jitter injected into every delta.
    let deltas: Vec<MotionDelta> = (0..99)
        .map(|i| {
            let jitter = if i % 2 == 0 { 2.0 } else { -2.0 };
            MotionDelta::new(1.0 + jitter, 0.0, 0.0)
        })
        .collect();

    let raw = Trajectory::accumulate(&deltas);
    let smoothed = raw.smooth(5).unwrap();
    let matrices = reconstruct(&raw, &smoothed, &deltas).unwrap();

    let corrected_dx: Vec<f64> = matrices.iter().map(|m| m[0][2]).collect();
    let raw_dx: Vec<f64> = deltas.iter().map(|d| d.dx).collect();

    let (raw_mean, raw_std) = mean_and_std(&raw_dx);
    let (mean, std) = mean_and_std(&corrected_dx);

    // Jitter is attenuated, true motion is preserved.
    assert!((raw_mean - 1.0).abs() < 0.1);
    assert!(std < raw_std * 0.75, "std {std} vs raw {raw_std}");
    assert!(std < 1.5, "corrected dx std too high: {std}");
    assert!((mean - 1.0).abs() < 0.1, "corrected dx mean drifted: {mean}");
}

#[test]
fn full_pipeline_stabilizes_synthetic_video() {
    // Camera path: slow pan with 1 px alternating jitter.
    let shifts: Vec<(i64, i64)> = (0..12).map(|i| (i / 2 + i % 2, 0)).collect();
    let frames: Vec<RgbImage> = shifts
        .iter()
        .map(|&s| checker_frame(96, 96, s))
        .collect();

    let mut source = MemorySource::from_frames(frames).unwrap();
    let mut sink = MemorySink::new();

    let config = StabConfig::new()
        .with_smoothing_radius(3)
        .with_max_tracked_points(200)
        .with_min_point_separation(8.0);
    let mut stabilizer = Stabilizer::new(config);

    let report = stabilizer.run(&mut source, &mut sink).unwrap();

    assert_eq!(stabilizer.state(), PipelineState::Done);
    assert_eq!(report.total_frames, 12);
    assert_eq!(report.stabilized_frames, 11);
    assert_eq!(sink.frames().len(), 11);
    assert!(sink.is_closed());
    for frame in sink.frames() {
        assert_eq!(frame.dimensions(), (96, 96));
    }
}

#[test]
fn featureless_video_loses_tracking() {
    let frames = vec![RgbImage::from_pixel(64, 64, Rgb([128, 128, 128])); 6];
    let mut source = MemorySource::from_frames(frames).unwrap();
    let mut sink = MemorySink::new();

    let mut stabilizer = Stabilizer::new(StabConfig::new().with_smoothing_radius(1));
    let err = stabilizer.run(&mut source, &mut sink).unwrap_err();

    assert!(matches!(err, StabError::TrackingLost(3)));
    assert_eq!(stabilizer.state(), PipelineState::Failed);
    assert!(sink.is_closed(), "sink must be closed on failure");
    assert!(sink.frames().is_empty());
}

#[test]
fn cancellation_stops_cleanly() {
    let frames: Vec<RgbImage> = (0..8).map(|i| checker_frame(64, 64, (i, 0))).collect();
    let mut source = MemorySource::from_frames(frames).unwrap();
    let mut sink = MemorySink::new();

    let cancel = CancelToken::new();
    cancel.cancel();

    let mut stabilizer = Stabilizer::new(StabConfig::new().with_smoothing_radius(1));
    let err = stabilizer
        .run_with_cancel(&mut source, &mut sink, &cancel)
        .unwrap_err();

    assert!(matches!(err, StabError::Cancelled(_)));
    assert!(sink.is_closed());
    assert!(sink.frames().is_empty(), "no partially-written output");
}

#[test]
fn single_frame_video_is_a_valid_empty_run() {
    let mut source = MemorySource::from_frames(vec![checker_frame(64, 64, (0, 0))]).unwrap();
    let mut sink = MemorySink::new();

    let mut stabilizer = Stabilizer::new(StabConfig::default());
    let report = stabilizer.run(&mut source, &mut sink).unwrap();

    assert_eq!(stabilizer.state(), PipelineState::Done);
    assert_eq!(
        report,
        StabilizationReport {
            total_frames: 1,
            stabilized_frames: 0,
            degraded_frames: 0,
        }
    );
    assert!(sink.is_closed());
}

#[test]
fn short_video_with_default_radius_is_an_invalid_radius_error() {
    // The default window (2*50+1) cannot fit a 10-frame trajectory; that is
    // a configuration error, surfaced immediately rather than clamped.
    let frames: Vec<RgbImage> = (0..11).map(|i| checker_frame(64, 64, (i, 0))).collect();
    let mut source = MemorySource::from_frames(frames).unwrap();
    let mut sink = MemorySink::new();

    let mut stabilizer = Stabilizer::new(StabConfig::default());
    let err = stabilizer.run(&mut source, &mut sink).unwrap_err();
    assert!(matches!(err, StabError::InvalidRadius(_)));
    assert!(sink.is_closed());
}

/// Scripted provider: replays a prescribed delta per frame pair, with
/// selected pairs reporting too few valid points.
struct ScriptedProvider {
    deltas: Vec<Option<MotionDelta>>,
    pair_index: RefCell<usize>,
}

impl ScriptedProvider {
    fn new(deltas: Vec<Option<MotionDelta>>) -> Self {
        Self {
            deltas,
            pair_index: RefCell::new(0),
        }
    }
}

impl CorrespondenceProvider for ScriptedProvider {
    fn detect_seed_points(&self, _gray: &image::GrayImage) -> KeyPoints {
        let mut kps = KeyPoints::new();
        for &(x, y) in &[(10.0, 10.0), (40.0, 12.0), (15.0, 45.0), (44.0, 40.0)] {
            kps.push(KeyPoint::new(x, y));
        }
        kps
    }

    fn track(
        &self,
        _prev: &image::GrayImage,
        _curr: &image::GrayImage,
        seeds: &KeyPoints,
    ) -> Vec<TrackedPoint> {
        let idx = *self.pair_index.borrow();
        *self.pair_index.borrow_mut() = idx + 1;

        match self.deltas.get(idx).copied().flatten() {
            Some(d) => seeds
                .iter()
                .map(|kp| TrackedPoint::found(Point2::new(kp.x + d.dx, kp.y + d.dy)))
                .collect(),
            // A bad pair: every point lost.
            None => seeds.iter().map(|kp| TrackedPoint::lost(kp.pt())).collect(),
        }
    }
}

#[test]
fn recoverable_failures_hold_previous_delta_and_are_counted() {
    let d = MotionDelta::new(2.0, 0.0, 0.0);
    // Pairs 2 and 5 fail; neither streak reaches the fatal threshold.
    let script = vec![Some(d), Some(d), None, Some(d), Some(d), None, Some(d)];
    let n_pairs = script.len();

    let frames = vec![RgbImage::from_pixel(64, 64, Rgb([0, 0, 0])); n_pairs + 1];
    let mut source = MemorySource::from_frames(frames).unwrap();
    let mut sink = MemorySink::new();

    let config = StabConfig::new().with_smoothing_radius(2);
    let mut stabilizer = Stabilizer::with_provider(config, ScriptedProvider::new(script));

    let report = stabilizer.run(&mut source, &mut sink).unwrap();
    assert_eq!(report.total_frames, n_pairs + 1);
    assert_eq!(report.stabilized_frames, n_pairs);
    assert_eq!(report.degraded_frames, 2);
}

#[test]
fn sink_close_failure_does_not_mask_pipeline_error() {
    // A featureless run fails with TrackingLost even if closing also fails.
    #[derive(Debug)]
    struct BrokenSink;
    impl FrameSink for BrokenSink {
        fn write_frame(&mut self, _frame: &RgbImage) -> vstab_videoio::Result<()> {
            Ok(())
        }
        fn close(&mut self) -> vstab_videoio::Result<()> {
            Err(vstab_videoio::VideoError::Backend("flush failed".into()))
        }
    }

    let frames = vec![RgbImage::from_pixel(64, 64, Rgb([77, 77, 77])); 6];
    let mut source = MemorySource::from_frames(frames).unwrap();
    let mut sink = BrokenSink;

    let mut stabilizer = Stabilizer::new(StabConfig::new().with_smoothing_radius(1));
    let err = stabilizer.run(&mut source, &mut sink).unwrap_err();
    assert!(matches!(err, StabError::TrackingLost(_)));
}

#[test]
fn robust_config_is_honored() {
    let config = StabConfig::new()
        .with_smoothing_radius(2)
        .with_robust(RobustConfig {
            threshold: 0.5,
            max_iterations: 200,
            confidence: 0.99,
        });
    let d = MotionDelta::new(1.0, 1.0, 0.0);
    let script = vec![Some(d); 6];

    let frames = vec![RgbImage::from_pixel(64, 64, Rgb([0, 0, 0])); 7];
    let mut source = MemorySource::from_frames(frames).unwrap();
    let mut sink = MemorySink::new();

    let mut stabilizer = Stabilizer::with_provider(config, ScriptedProvider::new(script));
    let report = stabilizer.run(&mut source, &mut sink).unwrap();
    assert_eq!(report.degraded_frames, 0);
    assert_eq!(report.stabilized_frames, 6);
}
