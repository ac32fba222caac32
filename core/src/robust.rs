//! Robust Estimation Module
//!
//! Generic RANSAC engine used to fit geometric models from correspondences
//! that contain outliers.

use rand::seq::index::sample;
use rand::Rng;

/// Configuration for robust estimation
#[derive(Debug, Clone)]
pub struct RobustConfig {
    /// Inlier threshold on the per-datum error.
    pub threshold: f64,
    pub max_iterations: usize,
    /// Fraction of inliers at which iteration stops early.
    pub confidence: f64,
}

impl Default for RobustConfig {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            max_iterations: 500,
            confidence: 0.99,
        }
    }
}

/// Result of robust estimation
#[derive(Debug, Clone)]
pub struct RobustResult<M> {
    pub model: Option<M>,
    pub inliers: Vec<bool>,
    pub num_inliers: usize,
    pub residual: f64,
}

impl<M> RobustResult<M> {
    fn empty(n: usize) -> Self {
        Self {
            model: None,
            inliers: vec![false; n],
            num_inliers: 0,
            residual: f64::INFINITY,
        }
    }
}

/// Trait for models that can be estimated robustly
pub trait RobustModel<D> {
    type Model: Clone;

    /// Minimum number of data points required to estimate the model
    fn min_sample_size(&self) -> usize;

    /// Estimate model from a minimal sample
    fn estimate(&self, data: &[&D]) -> Option<Self::Model>;

    /// Compute error for a single data point against the model
    fn compute_error(&self, model: &Self::Model, data: &D) -> f64;
}

/// Generic RANSAC engine
pub struct Ransac {
    config: RobustConfig,
}

impl Ransac {
    pub fn new(config: RobustConfig) -> Self {
        Self { config }
    }

    pub fn run<D, M: RobustModel<D>>(&self, estimator: &M, data: &[D]) -> RobustResult<M::Model> {
        let mut rng = rand::thread_rng();
        self.run_with_rng(estimator, data, &mut rng)
    }

    /// Same as [`Ransac::run`] but with a caller-supplied RNG, so tests can
    /// make the sampling sequence reproducible.
    pub fn run_with_rng<D, M: RobustModel<D>, R: Rng>(
        &self,
        estimator: &M,
        data: &[D],
        rng: &mut R,
    ) -> RobustResult<M::Model> {
        let n = data.len();
        let k = estimator.min_sample_size();

        if n < k {
            return RobustResult::empty(n);
        }

        let mut best = RobustResult::empty(n);

        for _ in 0..self.config.max_iterations {
            let picked = sample(rng, n, k);
            let minimal: Vec<&D> = picked.iter().map(|i| &data[i]).collect();

            let Some(model) = estimator.estimate(&minimal) else {
                continue;
            };

            let mut inliers = vec![false; n];
            let mut num_inliers = 0;
            let mut total_error = 0.0;

            for (j, d) in data.iter().enumerate() {
                let err = estimator.compute_error(&model, d);
                if err < self.config.threshold {
                    inliers[j] = true;
                    num_inliers += 1;
                    total_error += err;
                }
            }

            let residual = if num_inliers > 0 {
                total_error / num_inliers as f64
            } else {
                f64::INFINITY
            };

            let better = num_inliers > best.num_inliers
                || (num_inliers == best.num_inliers && residual < best.residual);
            if better {
                best = RobustResult {
                    model: Some(model),
                    inliers,
                    num_inliers,
                    residual,
                };

                if num_inliers as f64 >= n as f64 * self.config.confidence {
                    break;
                }
            }
        }

        best
    }
}
