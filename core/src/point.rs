//! Point correspondences between consecutive frames
//!
//! Tracking results carry their validity with the point itself, so the
//! geometric data and the outcome can never fall out of sync with a
//! separate mask array.

use crate::KeyPoints;
use nalgebra::Point2;

/// A point reported by the tracker, tagged with whether tracking succeeded.
#[derive(Debug, Clone, Copy)]
pub struct TrackedPoint {
    pub point: Point2<f64>,
    pub valid: bool,
}

impl TrackedPoint {
    pub fn found(point: Point2<f64>) -> Self {
        Self { point, valid: true }
    }

    /// A point the tracker failed on; the position holds the last known one.
    pub fn lost(point: Point2<f64>) -> Self {
        Self {
            point,
            valid: false,
        }
    }
}

/// Positions of the same feature observed in two consecutive frames.
#[derive(Debug, Clone, Copy)]
pub struct Correspondence {
    pub prev: Point2<f64>,
    pub curr: Point2<f64>,
}

impl Correspondence {
    pub fn new(prev: Point2<f64>, curr: Point2<f64>) -> Self {
        Self { prev, curr }
    }
}

/// Pair seed points with their tracking outcomes, keeping valid pairs only.
///
/// Seeds and outcomes are matched by index; extra entries on either side are
/// ignored rather than mispaired.
pub fn pair_valid(seeds: &KeyPoints, tracked: &[TrackedPoint]) -> Vec<Correspondence> {
    seeds
        .iter()
        .zip(tracked.iter())
        .filter(|(_, t)| t.valid)
        .map(|(s, t)| Correspondence::new(s.pt(), t.point))
        .collect()
}
