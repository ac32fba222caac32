//! Frame rendering
//!
//! Applies the corrective warp to each frame, then a fixed zoom-in about
//! the frame center so the undefined border pixels the warp drags in stay
//! outside the visible area.

use crate::{Result, StabError};
use image::RgbImage;
use vstab_imgproc::{get_rotation_matrix_2d, warp_affine_rgb, AffineMat};

/// Rotation-block determinants below this are treated as non-invertible.
const DEGENERACY_EPS: f64 = 1e-9;

pub struct FrameRenderer {
    /// Fixed zoom-in factor for border compensation.
    pub border_zoom: f64,
}

impl Default for FrameRenderer {
    fn default() -> Self {
        Self { border_zoom: 1.30 }
    }
}

impl FrameRenderer {
    pub fn new(border_zoom: f64) -> Self {
        Self { border_zoom }
    }

    /// Warp `frame` by `matrix` at `output_size`, then crop border
    /// artifacts with the fixed zoom. Returns a new frame; the input is
    /// never mutated.
    pub fn render(
        &self,
        frame: &RgbImage,
        matrix: &AffineMat,
        output_size: (u32, u32),
    ) -> Result<RgbImage> {
        // A valid corrective matrix is always invertible; check anyway so a
        // broken caller fails loudly instead of rendering garbage.
        let det = matrix[0][0] * matrix[1][1] - matrix[0][1] * matrix[1][0];
        if det.abs() < DEGENERACY_EPS {
            return Err(StabError::RenderFailure(format!(
                "corrective matrix is singular (det {det:e})"
            )));
        }
        if self.border_zoom <= 0.0 {
            return Err(StabError::RenderFailure(format!(
                "border zoom {} is not positive",
                self.border_zoom
            )));
        }

        let (width, height) = output_size;
        let warped = warp_affine_rgb(frame, matrix, width, height)
            .map_err(|e| StabError::RenderFailure(e.to_string()))?;

        self.fix_border(&warped)
    }

    /// Zoom about the frame center with zero rotation and translation.
    fn fix_border(&self, frame: &RgbImage) -> Result<RgbImage> {
        let (width, height) = frame.dimensions();
        let center = (width as f64 / 2.0, height as f64 / 2.0);
        let zoom = get_rotation_matrix_2d(center, 0.0, self.border_zoom);

        warp_affine_rgb(frame, &zoom, width, height)
            .map_err(|e| StabError::RenderFailure(e.to_string()))
    }
}
