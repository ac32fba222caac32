//! In-memory frame arena
//!
//! Holds every decoded frame in an index-addressable store, giving exact
//! frame counts and O(1) seeks. This is the arena-style backing the
//! two-pass pipeline assumes when re-decoding from disk is undesirable,
//! and the natural source/sink for tests.

use crate::{FrameSink, FrameSource, Result, VideoError};
use image::RgbImage;

#[derive(Debug)]
pub struct MemorySource {
    frames: Vec<RgbImage>,
    current_idx: usize,
    width: u32,
    height: u32,
}

impl MemorySource {
    pub fn from_frames(frames: Vec<RgbImage>) -> Result<Self> {
        let first = frames
            .first()
            .ok_or_else(|| VideoError::InvalidParameters("no frames supplied".to_string()))?;
        let (width, height) = first.dimensions();

        if let Some(bad) = frames.iter().find(|f| f.dimensions() != (width, height)) {
            return Err(VideoError::InvalidParameters(format!(
                "frame size {:?} differs from first frame {:?}",
                bad.dimensions(),
                (width, height)
            )));
        }

        Ok(Self {
            frames,
            current_idx: 0,
            width,
            height,
        })
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let Some(frame) = self.frames.get(self.current_idx) else {
            return Ok(None);
        };
        self.current_idx += 1;
        Ok(Some(frame.clone()))
    }

    fn seek(&mut self, frame_index: usize) -> Result<()> {
        if frame_index > self.frames.len() {
            return Err(VideoError::SeekOutOfRange(frame_index, self.frames.len()));
        }
        self.current_idx = frame_index;
        Ok(())
    }

    fn frame_count(&self) -> Option<usize> {
        Some(self.frames.len())
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

#[derive(Debug, Default)]
pub struct MemorySink {
    frames: Vec<RgbImage>,
    closed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[RgbImage] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<RgbImage> {
        self.frames
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if self.closed {
            return Err(VideoError::Backend("sink is closed".to_string()));
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
