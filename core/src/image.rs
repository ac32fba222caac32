use image::{GrayImage, Luma, Rgb, RgbImage};

/// Convert a color frame to the grayscale working copy used for detection
/// and tracking. Rec. 601 luma weights.
pub fn rgb_to_gray(rgb: &RgbImage) -> GrayImage {
    let mut gray = GrayImage::new(rgb.width(), rgb.height());
    for (dst, src) in gray.pixels_mut().zip(rgb.pixels()) {
        let [r, g, b] = src.0;
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        *dst = Luma([luma.round().clamp(0.0, 255.0) as u8]);
    }
    gray
}

/// Expand a grayscale image to three channels.
pub fn gray_to_rgb(gray: &GrayImage) -> RgbImage {
    let mut rgb = RgbImage::new(gray.width(), gray.height());
    for (dst, src) in rgb.pixels_mut().zip(gray.pixels()) {
        let v = src.0[0];
        *dst = Rgb([v, v, v]);
    }
    rgb
}
