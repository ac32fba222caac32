pub use vstab_core as core;
pub use vstab_features as features;
pub use vstab_imgproc as imgproc;
pub use vstab_stab as stab;
pub use vstab_video as video;
pub use vstab_videoio as videoio;

/// Initialize a single global Rayon thread pool for all CPU-parallel routines.
///
/// Call this once at application startup before stabilizing video.
/// Repeated calls are idempotent and return the first initialization result.
///
/// Priority order:
/// 1. explicit `num_threads`
/// 2. `VIDEOSTAB_CPU_THREADS` env var
/// 3. Rayon default
pub fn init_thread_pool(num_threads: Option<usize>) -> Result<(), String> {
    vstab_core::init_global_thread_pool(num_threads)
}
