//! Robust frame-to-frame motion estimation
//!
//! Fits a single 2x3 affine transform to tracked point correspondences with
//! RANSAC, refines it on the inlier set, and reduces it to the (dx, dy, da)
//! delta the trajectory works in. The rotation angle comes from atan2 on the
//! matrix's rotation block, which is invariant to any uniform scale the fit
//! also recovered, so scale drift cannot corrupt the angle estimate.

use crate::{MotionDelta, Result, StabError};
use nalgebra::{DMatrix, DVector};
use vstab_core::{Correspondence, Ransac, RobustConfig, RobustModel};
use vstab_imgproc::{transform_point, AffineMat};

/// An affine fit needs three non-collinear point pairs.
pub const MIN_AFFINE_POINTS: usize = 3;

/// Relative singular-value cutoff below which the fit is rank-deficient.
const RANK_EPS: f64 = 1e-9;

/// Full 2x3 affine model over point correspondences, for the RANSAC engine.
struct AffineModel;

impl RobustModel<Correspondence> for AffineModel {
    type Model = AffineMat;

    fn min_sample_size(&self) -> usize {
        MIN_AFFINE_POINTS
    }

    fn estimate(&self, data: &[&Correspondence]) -> Option<AffineMat> {
        solve_affine(data)
    }

    fn compute_error(&self, model: &AffineMat, data: &Correspondence) -> f64 {
        let (px, py) = transform_point(model, data.prev.x, data.prev.y);
        ((px - data.curr.x).powi(2) + (py - data.curr.y).powi(2)).sqrt()
    }
}

/// Least-squares affine solve over all given pairs.
///
/// Builds the 2n x 6 system mapping prev to curr and solves it by SVD.
/// Returns `None` when the system is rank-deficient (e.g. all points
/// collinear), which is how degenerate samples are rejected.
fn solve_affine(pairs: &[&Correspondence]) -> Option<AffineMat> {
    let n = pairs.len();
    if n < MIN_AFFINE_POINTS {
        return None;
    }

    let mut a = DMatrix::zeros(2 * n, 6);
    let mut b = DVector::zeros(2 * n);

    for (i, pair) in pairs.iter().enumerate() {
        let (x, y) = (pair.prev.x, pair.prev.y);
        let r = 2 * i;

        a[(r, 0)] = x;
        a[(r, 1)] = y;
        a[(r, 2)] = 1.0;
        b[r] = pair.curr.x;

        a[(r + 1, 3)] = x;
        a[(r + 1, 4)] = y;
        a[(r + 1, 5)] = 1.0;
        b[r + 1] = pair.curr.y;
    }

    let svd = a.svd(true, true);
    let max_sv = svd.singular_values.max();
    let rank = svd
        .singular_values
        .iter()
        .filter(|&&sv| sv > max_sv * RANK_EPS)
        .count();
    if rank < 6 {
        return None;
    }

    let x = svd.solve(&b, max_sv * RANK_EPS).ok()?;
    Some([[x[0], x[1], x[2]], [x[3], x[4], x[5]]])
}

/// Reduce a fitted affine matrix to the trajectory's delta components.
pub fn decompose(m: &AffineMat) -> MotionDelta {
    MotionDelta::new(m[0][2], m[1][2], m[1][0].atan2(m[0][0]))
}

/// Robust estimator for the dominant camera motion between two frames.
pub struct MotionEstimator {
    /// Minimum valid correspondences required before fitting.
    pub min_points: usize,
    pub robust: RobustConfig,
}

impl Default for MotionEstimator {
    fn default() -> Self {
        Self {
            min_points: MIN_AFFINE_POINTS,
            robust: RobustConfig::default(),
        }
    }
}

impl MotionEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points.max(MIN_AFFINE_POINTS);
        self
    }

    pub fn with_robust(mut self, robust: RobustConfig) -> Self {
        self.robust = robust;
        self
    }

    /// Fit the dominant affine motion mapping previous-frame points onto
    /// current-frame points. Pure function of its inputs.
    pub fn estimate(&self, pairs: &[Correspondence]) -> Result<MotionDelta> {
        let needed = self.min_points.max(MIN_AFFINE_POINTS);
        if pairs.len() < needed {
            return Err(StabError::InsufficientCorrespondences(pairs.len(), needed));
        }

        let ransac = Ransac::new(self.robust.clone());
        let result = ransac.run(&AffineModel, pairs);

        let mut model = result.model.ok_or_else(|| {
            StabError::DegenerateFit(
                "no stable affine solution exists for the correspondences".to_string(),
            )
        })?;

        // Refit on the consensus set for a fit the minimal sample can't give.
        if result.num_inliers > MIN_AFFINE_POINTS {
            let inliers: Vec<&Correspondence> = pairs
                .iter()
                .zip(&result.inliers)
                .filter(|(_, &keep)| keep)
                .map(|(p, _)| p)
                .collect();
            if let Some(refined) = solve_affine(&inliers) {
                model = refined;
            }
        }

        Ok(decompose(&model))
    }
}
