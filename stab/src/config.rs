use vstab_core::RobustConfig;

/// Stabilization pipeline configuration.
#[derive(Debug, Clone)]
pub struct StabConfig {
    /// Moving-average half-window; the filter spans `2 * radius + 1` frames.
    pub smoothing_radius: usize,
    /// Minimum valid correspondences per frame pair for an affine fit.
    pub min_tracked_points: usize,
    /// Upper bound on seed points detected per frame.
    pub max_tracked_points: usize,
    /// Minimum pixel distance between two seed points.
    pub min_point_separation: f64,
    /// Corner quality threshold relative to the strongest corner.
    pub quality_level: f64,
    /// Fixed zoom-in factor hiding warp border artifacts.
    pub border_zoom: f64,
    /// Consecutive failed frame pairs tolerated before tracking is lost.
    pub max_consecutive_failures: usize,
    /// Robust affine-fit settings.
    pub robust: RobustConfig,
}

impl Default for StabConfig {
    fn default() -> Self {
        Self {
            smoothing_radius: 50,
            min_tracked_points: 3,
            max_tracked_points: 100,
            min_point_separation: 10.0,
            quality_level: 0.10,
            border_zoom: 1.30,
            max_consecutive_failures: 3,
            robust: RobustConfig::default(),
        }
    }
}

impl StabConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_smoothing_radius(mut self, radius: usize) -> Self {
        self.smoothing_radius = radius;
        self
    }

    pub fn with_min_tracked_points(mut self, min: usize) -> Self {
        self.min_tracked_points = min;
        self
    }

    pub fn with_max_tracked_points(mut self, max: usize) -> Self {
        self.max_tracked_points = max;
        self
    }

    pub fn with_min_point_separation(mut self, distance: f64) -> Self {
        self.min_point_separation = distance;
        self
    }

    pub fn with_border_zoom(mut self, zoom: f64) -> Self {
        self.border_zoom = zoom;
        self
    }

    pub fn with_robust(mut self, robust: RobustConfig) -> Self {
        self.robust = robust;
        self
    }
}
