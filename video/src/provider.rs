//! Correspondence provider boundary
//!
//! The stabilization pipeline does not detect or track features itself; it
//! consumes a provider that, given two grayscale frames and seed points in
//! the first, reports where each seed moved and whether tracking held.

use crate::LucasKanade;
use image::GrayImage;
use vstab_core::{KeyPoints, TrackedPoint};
use vstab_features::{gftt_detect, GfttParams};

/// Supplies point correspondences between consecutive frames.
pub trait CorrespondenceProvider {
    /// Detect fresh seed points on a grayscale frame.
    fn detect_seed_points(&self, gray: &GrayImage) -> KeyPoints;

    /// Track `seeds` from `prev` into `curr`. Returns one tagged point per
    /// seed, in seed order; points the tracker lost are tagged invalid.
    fn track(&self, prev: &GrayImage, curr: &GrayImage, seeds: &KeyPoints) -> Vec<TrackedPoint>;
}

/// Shi-Tomasi seeding plus pyramidal Lucas-Kanade tracking.
///
/// Seeds are re-detected from scratch on every frame pair, matching the
/// fixed per-frame reseed cadence of the pipeline.
pub struct GfttLkProvider {
    pub detector: GfttParams,
    pub flow: LucasKanade,
}

impl GfttLkProvider {
    pub fn new(detector: GfttParams, flow: LucasKanade) -> Self {
        Self { detector, flow }
    }
}

impl Default for GfttLkProvider {
    fn default() -> Self {
        Self::new(GfttParams::default(), LucasKanade::default())
    }
}

impl CorrespondenceProvider for GfttLkProvider {
    fn detect_seed_points(&self, gray: &GrayImage) -> KeyPoints {
        gftt_detect(gray, &self.detector)
    }

    fn track(&self, prev: &GrayImage, curr: &GrayImage, seeds: &KeyPoints) -> Vec<TrackedPoint> {
        let points: Vec<_> = seeds.iter().map(|kp| kp.pt()).collect();

        match self.flow.track_points(prev, curr, &points) {
            Ok(tracked) => points
                .iter()
                .zip(tracked)
                .map(|(&seed, outcome)| match outcome {
                    Some(p) => TrackedPoint::found(p),
                    None => TrackedPoint::lost(seed),
                })
                .collect(),
            // Frames the tracker cannot pair (size mismatch) yield no valid
            // points; the caller's degradation policy takes over.
            Err(_) => points.iter().map(|&p| TrackedPoint::lost(p)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn checkered(width: u32, height: u32, shift: i64) -> GrayImage {
        let mut img = GrayImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let cell = ((x as i64 - shift) / 8 + y as i64 / 8) % 2;
                img.put_pixel(x, y, Luma([if cell == 0 { 230 } else { 25 }]));
            }
        }
        img
    }

    #[test]
    fn provider_reseeds_and_tracks() {
        let prev = checkered(64, 64, 0);
        let curr = checkered(64, 64, 2);

        let provider = GfttLkProvider::default();
        let seeds = provider.detect_seed_points(&prev);
        assert!(!seeds.is_empty(), "checkerboard should yield seeds");

        let tracked = provider.track(&prev, &curr, &seeds);
        assert_eq!(tracked.len(), seeds.len());
        assert!(tracked.iter().any(|t| t.valid));
    }

    #[test]
    fn provider_tags_all_lost_on_frame_mismatch() {
        let prev = checkered(64, 64, 0);
        let curr = checkered(32, 32, 0);

        let provider = GfttLkProvider::default();
        let seeds = provider.detect_seed_points(&prev);
        let tracked = provider.track(&prev, &curr, &seeds);

        assert_eq!(tracked.len(), seeds.len());
        assert!(tracked.iter().all(|t| !t.valid));
    }
}
