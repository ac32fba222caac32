//! Numbered-PNG frame sequences on disk
//!
//! Frames are stored as `<prefix>_000042.png`. The source loads frames
//! lazily and seeks by adjusting its index, so the two-pass pipeline can
//! rewind without holding the whole sequence in memory.

use crate::{FrameSink, FrameSource, Result, VideoError};
use image::RgbImage;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct PngSequenceSource {
    files: Vec<PathBuf>,
    current_idx: usize,
    width: u32,
    height: u32,
}

impl PngSequenceSource {
    pub fn new(directory: &Path, prefix: &str) -> Result<Self> {
        let mut files = Vec::new();
        for entry in fs::read_dir(directory)? {
            let path = entry?.path();
            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(n) => n,
                None => continue,
            };
            if name.starts_with(prefix) && name.ends_with(".png") {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(VideoError::Backend(format!(
                "no '{prefix}*.png' frames in {}",
                directory.display()
            )));
        }

        let first = load_frame(&files[0])?;
        Ok(Self {
            files,
            current_idx: 0,
            width: first.width(),
            height: first.height(),
        })
    }
}

impl FrameSource for PngSequenceSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let Some(path) = self.files.get(self.current_idx) else {
            return Ok(None);
        };
        let frame = load_frame(path)?;

        if frame.dimensions() != (self.width, self.height) {
            return Err(VideoError::Backend(format!(
                "frame {} has size {:?}, sequence is {:?}",
                path.display(),
                frame.dimensions(),
                (self.width, self.height)
            )));
        }

        self.current_idx += 1;
        Ok(Some(frame))
    }

    fn seek(&mut self, frame_index: usize) -> Result<()> {
        if frame_index > self.files.len() {
            return Err(VideoError::SeekOutOfRange(frame_index, self.files.len()));
        }
        self.current_idx = frame_index;
        Ok(())
    }

    fn frame_count(&self) -> Option<usize> {
        Some(self.files.len())
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

fn load_frame(path: &Path) -> Result<RgbImage> {
    let img = image::open(path)
        .map_err(|e| VideoError::Backend(format!("failed to load {}: {e}", path.display())))?;
    Ok(img.into_rgb8())
}

#[derive(Debug)]
pub struct PngSequenceSink {
    directory: PathBuf,
    prefix: String,
    frame_count: usize,
    closed: bool,
}

impl PngSequenceSink {
    pub fn new(directory: &Path, prefix: &str) -> Result<Self> {
        if !directory.exists() {
            fs::create_dir_all(directory)?;
        }

        Ok(Self {
            directory: directory.to_path_buf(),
            prefix: prefix.to_string(),
            frame_count: 0,
            closed: false,
        })
    }

    pub fn frames_written(&self) -> usize {
        self.frame_count
    }
}

impl FrameSink for PngSequenceSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if self.closed {
            return Err(VideoError::Backend("sink is closed".to_string()));
        }

        let filename = format!("{}_{:06}.png", self.prefix, self.frame_count);
        let path = self.directory.join(filename);
        frame
            .save(&path)
            .map_err(|e| VideoError::Backend(format!("failed to save frame: {e}")))?;
        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        // PNG writes are flushed per frame; closing just seals the sink.
        self.closed = true;
        Ok(())
    }
}
