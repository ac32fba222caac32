//! Sparse iterative pyramidal Lucas-Kanade optical flow
//!
//! Tracks feature points between two grayscale frames. The displacement is
//! solved coarse-to-fine over an image pyramid; at each level a Gauss-Newton
//! iteration refines the flow until the update falls below `epsilon` or
//! `max_iterations` is reached.

use crate::{FlowError, Result};
use image::imageops::{self, FilterType};
use image::GrayImage;
use nalgebra::{Matrix2, Point2, Vector2};

/// Lucas-Kanade optical flow tracker
pub struct LucasKanade {
    /// Side length of the correlation window, in pixels. Must be odd.
    pub window_size: usize,
    pub max_iterations: usize,
    /// Convergence threshold on the per-iteration update norm.
    pub epsilon: f64,
    /// Pyramid depth including the full-resolution level.
    pub pyramid_levels: usize,
    /// Windows whose gradient matrix has a smaller normalized eigenvalue
    /// than this are considered untrackable.
    pub min_eigen_threshold: f64,
}

impl Default for LucasKanade {
    fn default() -> Self {
        Self {
            window_size: 15,
            max_iterations: 10,
            epsilon: 0.03,
            pyramid_levels: 3,
            min_eigen_threshold: 1e-4,
        }
    }
}

impl LucasKanade {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window_size(mut self, size: usize) -> Self {
        self.window_size = size;
        self
    }

    pub fn with_pyramid_levels(mut self, levels: usize) -> Self {
        self.pyramid_levels = levels.max(1);
        self
    }

    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Track multiple points from `prev_frame` to `next_frame`.
    ///
    /// Returns one entry per input point: the tracked position, or `None`
    /// when the point could not be followed.
    pub fn track_points(
        &self,
        prev_frame: &GrayImage,
        next_frame: &GrayImage,
        points: &[Point2<f64>],
    ) -> Result<Vec<Option<Point2<f64>>>> {
        if prev_frame.dimensions() != next_frame.dimensions() {
            return Err(FlowError::SizeMismatch(format!(
                "prev {:?} vs next {:?}",
                prev_frame.dimensions(),
                next_frame.dimensions()
            )));
        }
        if self.window_size < 3 || self.window_size % 2 == 0 {
            return Err(FlowError::InvalidParameters(
                "window_size must be odd and >= 3".to_string(),
            ));
        }

        let levels = self.usable_levels(prev_frame);
        let prev_pyr = build_pyramid(prev_frame, levels);
        let next_pyr = build_pyramid(next_frame, levels);

        Ok(points
            .iter()
            .map(|&p| self.track_through_pyramid(&prev_pyr, &next_pyr, p))
            .collect())
    }

    /// Track a single point. Builds the pyramids internally; prefer
    /// [`LucasKanade::track_points`] when tracking many points per frame.
    pub fn track_point(
        &self,
        prev_frame: &GrayImage,
        next_frame: &GrayImage,
        point: Point2<f64>,
    ) -> Result<Option<Point2<f64>>> {
        Ok(self
            .track_points(prev_frame, next_frame, &[point])?
            .pop()
            .flatten())
    }

    /// Cap the pyramid depth so the coarsest level still fits the window.
    fn usable_levels(&self, frame: &GrayImage) -> usize {
        let min_dim = frame.width().min(frame.height()) as usize;
        let mut levels = 1;
        while levels < self.pyramid_levels && (min_dim >> levels) >= 2 * self.window_size {
            levels += 1;
        }
        levels
    }

    fn track_through_pyramid(
        &self,
        prev_pyr: &[GrayImage],
        next_pyr: &[GrayImage],
        point: Point2<f64>,
    ) -> Option<Point2<f64>> {
        let top = prev_pyr.len() - 1;
        let scale = (1 << top) as f64;
        let mut flow = Vector2::zeros();
        let mut base = Point2::new(point.x / scale, point.y / scale);

        for level in (0..prev_pyr.len()).rev() {
            flow = self.refine_at_level(&prev_pyr[level], &next_pyr[level], base, flow)?;

            if level > 0 {
                base = Point2::new(base.x * 2.0, base.y * 2.0);
                flow *= 2.0;
            }
        }

        let tracked = Point2::new(point.x + flow.x, point.y + flow.y);
        let full = &next_pyr[0];
        let inside = tracked.x >= 0.0
            && tracked.y >= 0.0
            && tracked.x <= (full.width() - 1) as f64
            && tracked.y <= (full.height() - 1) as f64;
        inside.then_some(tracked)
    }

    /// One pyramid level of Gauss-Newton refinement.
    fn refine_at_level(
        &self,
        prev: &GrayImage,
        next: &GrayImage,
        point: Point2<f64>,
        initial_flow: Vector2<f64>,
    ) -> Option<Vector2<f64>> {
        let half = (self.window_size / 2) as i32;

        if point.x < 1.0
            || point.y < 1.0
            || point.x > (prev.width() as i32 - 2) as f64
            || point.y > (prev.height() as i32 - 2) as f64
        {
            return None;
        }

        // Spatial gradients of the previous frame are fixed across
        // iterations; precompute them with the 2x2 normal matrix.
        let n = self.window_size * self.window_size;
        let mut grads = Vec::with_capacity(n);
        let mut a: Matrix2<f64> = Matrix2::zeros();

        for dy in -half..=half {
            for dx in -half..=half {
                let sx = point.x + dx as f64;
                let sy = point.y + dy as f64;

                let ix = (sample_bilinear(prev, sx + 1.0, sy) - sample_bilinear(prev, sx - 1.0, sy))
                    / 2.0;
                let iy = (sample_bilinear(prev, sx, sy + 1.0) - sample_bilinear(prev, sx, sy - 1.0))
                    / 2.0;

                a[(0, 0)] += ix * ix;
                a[(0, 1)] += ix * iy;
                a[(1, 0)] += ix * iy;
                a[(1, 1)] += iy * iy;
                grads.push((ix, iy));
            }
        }

        // Reject flat or edge-only windows (aperture problem).
        let trace = a[(0, 0)] + a[(1, 1)];
        let det = a[(0, 0)] * a[(1, 1)] - a[(0, 1)] * a[(1, 0)];
        let min_eig = (trace - (trace * trace - 4.0 * det).max(0.0).sqrt()) / 2.0;
        if min_eig / (n as f64) < self.min_eigen_threshold {
            return None;
        }

        let a_inv = a.try_inverse()?;
        let mut flow = initial_flow;

        for _ in 0..self.max_iterations {
            let mut b: Vector2<f64> = Vector2::zeros();
            let mut idx = 0;

            for dy in -half..=half {
                for dx in -half..=half {
                    let sx = point.x + dx as f64;
                    let sy = point.y + dy as f64;

                    let it = sample_bilinear(next, sx + flow.x, sy + flow.y)
                        - sample_bilinear(prev, sx, sy);
                    let (ix, iy) = grads[idx];
                    idx += 1;

                    b[0] -= ix * it;
                    b[1] -= iy * it;
                }
            }

            let delta = a_inv * b;
            flow += delta;

            if delta.norm() < self.epsilon {
                break;
            }
        }

        Some(flow)
    }
}

/// Gaussian-filtered half-resolution pyramid, level 0 at full resolution.
fn build_pyramid(frame: &GrayImage, levels: usize) -> Vec<GrayImage> {
    let mut pyramid = vec![frame.clone()];
    for _ in 1..levels {
        let last = pyramid.last().expect("pyramid is never empty");
        let w = (last.width() / 2).max(1);
        let h = (last.height() / 2).max(1);
        pyramid.push(imageops::resize(last, w, h, FilterType::Gaussian));
    }
    pyramid
}

/// Bilinear sample with edge clamping.
fn sample_bilinear(img: &GrayImage, x: f64, y: f64) -> f64 {
    let w = img.width() as i64;
    let h = img.height() as i64;

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let px = |xi: i64, yi: i64| -> f64 {
        let cx = xi.clamp(0, w - 1) as u32;
        let cy = yi.clamp(0, h - 1) as u32;
        img.get_pixel(cx, cy)[0] as f64
    };

    let v00 = px(x0, y0);
    let v10 = px(x0 + 1, y0);
    let v01 = px(x0, y0 + 1);
    let v11 = px(x0 + 1, y0 + 1);

    let v0 = v00 * (1.0 - fx) + v10 * fx;
    let v1 = v01 * (1.0 - fx) + v11 * fx;
    v0 * (1.0 - fy) + v1 * fy
}
