use image::GrayImage;
use vstab_core::{KeyPoint, KeyPoints};

/// Good-features-to-track detection parameters.
#[derive(Debug, Clone)]
pub struct GfttParams {
    /// Keep at most this many corners, strongest first.
    pub max_corners: usize,
    /// Corners weaker than `quality_level * strongest_response` are dropped.
    pub quality_level: f64,
    /// Minimum pixel distance between two accepted corners.
    pub min_distance: f64,
    /// Side length of the structure-tensor window. Must be odd.
    pub block_size: usize,
}

impl Default for GfttParams {
    fn default() -> Self {
        Self {
            max_corners: 100,
            quality_level: 0.10,
            min_distance: 10.0,
            block_size: 3,
        }
    }
}

/// Detect corners by the Shi-Tomasi minimum-eigenvalue criterion.
///
/// Candidates are thresholded against the strongest response, sorted by
/// response, and thinned by `min_distance` greedy suppression.
pub fn gftt_detect(image: &GrayImage, params: &GfttParams) -> KeyPoints {
    let width = image.width() as i32;
    let height = image.height() as i32;
    let half_window = (params.block_size / 2).max(1) as i32;

    let mut candidates = Vec::new();
    let mut max_score = 0.0f64;

    for y in (half_window + 1)..(height - half_window - 1) {
        for x in (half_window + 1)..(width - half_window - 1) {
            let score = min_eigenvalue_response(image, x, y, half_window);
            if score > 0.0 {
                if score > max_score {
                    max_score = score;
                }
                candidates.push((x, y, score));
            }
        }
    }

    // Filter by quality level
    let threshold = max_score * params.quality_level;
    candidates.retain(|&(_, _, s)| s >= threshold);

    // Sort by score descending
    candidates.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut corners = KeyPoints::new();
    let min_dist_sq = params.min_distance * params.min_distance;

    for (x, y, score) in candidates {
        if corners.len() >= params.max_corners {
            break;
        }

        let too_close = corners.iter().any(|kp| {
            let dx = x as f64 - kp.x;
            let dy = y as f64 - kp.y;
            dx * dx + dy * dy < min_dist_sq
        });

        if !too_close {
            corners.push(KeyPoint::new(x as f64, y as f64).with_response(score));
        }
    }

    corners
}

/// Smaller eigenvalue of the gradient structure tensor over the window.
fn min_eigenvalue_response(image: &GrayImage, x: i32, y: i32, half_window: i32) -> f64 {
    let mut i_xx = 0.0f64;
    let mut i_yy = 0.0f64;
    let mut i_xy = 0.0f64;

    for by in -half_window..=half_window {
        for bx in -half_window..=half_window {
            let gx = image.get_pixel((x + bx + 1) as u32, (y + by) as u32)[0] as f64
                - image.get_pixel((x + bx - 1) as u32, (y + by) as u32)[0] as f64;
            let gy = image.get_pixel((x + bx) as u32, (y + by + 1) as u32)[0] as f64
                - image.get_pixel((x + bx) as u32, (y + by - 1) as u32)[0] as f64;

            i_xx += gx * gx;
            i_yy += gy * gy;
            i_xy += gx * gy;
        }
    }

    let trace = i_xx + i_yy;
    let term = ((i_xx - i_yy).powi(2) + 4.0 * i_xy * i_xy).sqrt();
    (trace - term) * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn create_test_image_with_corners() -> GrayImage {
        let mut img = GrayImage::new(30, 30);
        for y in 0..30 {
            for x in 0..30 {
                let val = if (x < 10 && y < 10)
                    || (x > 19 && y < 10)
                    || (x < 10 && y > 19)
                    || (x > 19 && y > 19)
                {
                    255
                } else {
                    0
                };
                img.put_pixel(x, y, Luma([val]));
            }
        }
        img
    }

    #[test]
    fn gftt_detect_finds_corners() {
        let img = create_test_image_with_corners();
        let kps = gftt_detect(&img, &GfttParams::default());
        assert!(!kps.is_empty(), "Should detect corners");
    }

    #[test]
    fn gftt_detect_uniform_image() {
        let img = GrayImage::from_pixel(30, 30, Luma([128]));
        let kps = gftt_detect(&img, &GfttParams::default());
        assert!(kps.is_empty(), "Uniform image should have no corners");
    }

    #[test]
    fn gftt_detect_max_corners_limit() {
        let img = create_test_image_with_corners();
        let params = GfttParams {
            max_corners: 2,
            quality_level: 0.01,
            min_distance: 5.0,
            ..GfttParams::default()
        };
        let kps = gftt_detect(&img, &params);
        assert!(kps.len() <= 2);
    }

    #[test]
    fn gftt_detect_min_distance() {
        let img = create_test_image_with_corners();
        let params = GfttParams {
            quality_level: 0.01,
            min_distance: 10.0,
            ..GfttParams::default()
        };
        let kps = gftt_detect(&img, &params);

        for i in 0..kps.len() {
            for j in (i + 1)..kps.len() {
                let dx = kps.keypoints[i].x - kps.keypoints[j].x;
                let dy = kps.keypoints[i].y - kps.keypoints[j].y;
                assert!((dx * dx + dy * dy).sqrt() >= 10.0);
            }
        }
    }

    #[test]
    fn gftt_detect_quality_level() {
        let img = create_test_image_with_corners();
        let low = GfttParams {
            quality_level: 0.001,
            ..GfttParams::default()
        };
        let high = GfttParams {
            quality_level: 0.5,
            ..GfttParams::default()
        };
        let kps_low = gftt_detect(&img, &low);
        let kps_high = gftt_detect(&img, &high);
        assert!(kps_low.len() >= kps_high.len());
    }

    #[test]
    fn gftt_keypoint_response_is_positive() {
        let img = create_test_image_with_corners();
        let kps = gftt_detect(&img, &GfttParams::default());

        for kp in kps.iter() {
            assert!(kp.response > 0.0);
        }
    }
}
