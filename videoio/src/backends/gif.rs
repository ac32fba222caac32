//! Animated GIF source
//!
//! Decodes every frame up-front into an in-memory arena, so seeking is a
//! cursor move rather than a re-decode.

use crate::{FrameSource, Result, VideoError};
use image::{AnimationDecoder, DynamicImage, RgbImage};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub struct GifSource {
    frames: Vec<RgbImage>,
    current_idx: usize,
    width: u32,
    height: u32,
}

impl std::fmt::Debug for GifSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GifSource")
            .field("frame_count", &self.frames.len())
            .field("current_idx", &self.current_idx)
            .finish()
    }
}

impl GifSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let decoder = image::codecs::gif::GifDecoder::new(reader)
            .map_err(|e| VideoError::Backend(format!("Failed to decode GIF: {e}")))?;

        let frames: Vec<RgbImage> = decoder
            .into_frames()
            .collect_frames()
            .map_err(|e| VideoError::Backend(format!("Failed to collect frames: {e}")))?
            .into_iter()
            .map(|f| DynamicImage::ImageRgba8(f.into_buffer()).into_rgb8())
            .collect();

        let Some(first) = frames.first() else {
            return Err(VideoError::Backend("GIF contains no frames".to_string()));
        };
        let (width, height) = first.dimensions();

        Ok(Self {
            frames,
            current_idx: 0,
            width,
            height,
        })
    }
}

impl FrameSource for GifSource {
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
