//! Frame input/output
//!
//! Seekable frame sources and frame sinks for the two-pass stabilization
//! pipeline: pass 1 walks the whole video to estimate motion, then seeks
//! back to frame 0 and re-reads every frame for rendering.
//!
//! End of stream is a normal signal (`Ok(None)` from `next_frame`), never
//! an error.

use image::RgbImage;
use std::fmt::Debug;
use std::path::Path;

pub type Result<T> = std::result::Result<T, VideoError>;

#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Seek out of range: frame {0}, stream has {1}")]
    SeekOutOfRange(usize, usize),
}

/// An ordered, re-seekable stream of decoded frames.
pub trait FrameSource: Send + Debug {
    /// The next frame in order, or `None` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;

    /// Position the stream so the next read returns `frame_index`.
    fn seek(&mut self, frame_index: usize) -> Result<()>;

    /// Number of frames, when the backend knows it. May be approximate for
    /// container formats; callers must still terminate on end of stream.
    fn frame_count(&self) -> Option<usize>;

    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

/// Destination for rendered frames.
pub trait FrameSink: Send + Debug {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// Flush and finalize. Idempotent; writes after close are rejected.
    fn close(&mut self) -> Result<()>;
}

pub mod backends;

/// Open a directory of numbered PNG frames as a source.
pub fn open_png_sequence(directory: &Path, prefix: &str) -> Result<Box<dyn FrameSource>> {
    let source = backends::PngSequenceSource::new(directory, prefix)?;
    Ok(Box::new(source))
}

/// Open an animated GIF as a fully decoded, seekable source.
pub fn open_gif<P: AsRef<Path>>(path: P) -> Result<Box<dyn FrameSource>> {
    let source = backends::GifSource::new(path)?;
    Ok(Box::new(source))
}
