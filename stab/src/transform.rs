//! Corrective transform reconstruction
//!
//! Rather than smoothing the per-frame deltas directly (which would leave
//! accumulated drift untouched), the correction feeds the difference
//! between the smoothed and raw trajectories back into each original
//! delta, then rebuilds a rigid 2x3 matrix from the corrected values.

use crate::{MotionDelta, Result, StabError, Trajectory};
use vstab_imgproc::AffineMat;

/// Rigid affine matrix for a corrected delta:
/// `[[cos da, -sin da, dx], [sin da, cos da, dy]]`.
pub fn affine_from_delta(delta: &MotionDelta) -> AffineMat {
    let (sin, cos) = delta.da.sin_cos();
    [[cos, -sin, delta.dx], [sin, cos, delta.dy]]
}

/// Per frame `k`: `corrected[k] = deltas[k] + (smoothed[k] - raw[k])`,
/// returned as ready-to-apply affine matrices.
pub fn reconstruct(
    raw: &Trajectory,
    smoothed: &Trajectory,
    deltas: &[MotionDelta],
) -> Result<Vec<AffineMat>> {
    if raw.len() != deltas.len() || smoothed.len() != deltas.len() {
        return Err(StabError::LengthMismatch(format!(
            "raw {}, smoothed {}, deltas {}",
            raw.len(),
            smoothed.len(),
            deltas.len()
        )));
    }

    let matrices = deltas
        .iter()
        .zip(raw.points.iter().zip(smoothed.points.iter()))
        .map(|(d, (r, s))| {
            let corrected = MotionDelta::new(
                d.dx + (s.x - r.x),
                d.dy + (s.y - r.y),
                d.da + (s.a - r.a),
            );
            affine_from_delta(&corrected)
        })
        .collect();

    Ok(matrices)
}
