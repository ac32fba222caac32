use crate::{validate_image_size, BorderMode, ImgprocError, Interpolation, Result};
use image::{GrayImage, RgbImage};
use nalgebra::Matrix3;
use rayon::prelude::*;

/// A 2x3 affine matrix in row-major order, mapping source to destination
/// coordinates.
pub type AffineMat = [[f64; 3]; 2];

pub const IDENTITY_AFFINE: AffineMat = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];

/// Rotation-plus-uniform-scale matrix about an arbitrary center, with zero
/// net displacement of the center itself. `angle` is in radians.
///
/// With `angle = 0` this is a pure zoom about `center`, which is how the
/// renderer hides warp border artifacts.
pub fn get_rotation_matrix_2d(center: (f64, f64), angle: f64, scale: f64) -> AffineMat {
    let alpha = scale * angle.cos();
    let beta = scale * angle.sin();
    let (cx, cy) = center;

    [
        [alpha, beta, (1.0 - alpha) * cx - beta * cy],
        [-beta, alpha, beta * cx + (1.0 - alpha) * cy],
    ]
}

/// Apply a 2x3 affine matrix to a point.
pub fn transform_point(m: &AffineMat, x: f64, y: f64) -> (f64, f64) {
    (
        m[0][0] * x + m[0][1] * y + m[0][2],
        m[1][0] * x + m[1][1] * y + m[1][2],
    )
}

/// Invert the forward mapping for destination-to-source sampling.
fn invert_affine(m: &AffineMat) -> Result<AffineMat> {
    let full = Matrix3::new(
        m[0][0], m[0][1], m[0][2], m[1][0], m[1][1], m[1][2], 0.0, 0.0, 1.0,
    );
    let inv = full.try_inverse().ok_or_else(|| {
        ImgprocError::DegenerateTransform("affine matrix is not invertible".into())
    })?;
    Ok([
        [inv[(0, 0)], inv[(0, 1)], inv[(0, 2)]],
        [inv[(1, 0)], inv[(1, 1)], inv[(1, 2)]],
    ])
}

fn map_coord(coord: isize, len: usize, mode: BorderMode) -> Option<usize> {
    let n = len as isize;
    if n <= 0 {
        return None;
    }

    match mode {
        BorderMode::Constant(_) => {
            if coord < 0 || coord >= n {
                None
            } else {
                Some(coord as usize)
            }
        }
        BorderMode::Replicate => Some(coord.clamp(0, n - 1) as usize),
    }
}

fn sample_gray(img: &GrayImage, x: isize, y: isize, border: BorderMode) -> f64 {
    let width = img.width() as usize;
    let height = img.height() as usize;
    let raw = img.as_raw();

    match (map_coord(x, width, border), map_coord(y, height, border)) {
        (Some(ix), Some(iy)) => raw[iy * width + ix] as f64,
        _ => match border {
            BorderMode::Constant(v) => v as f64,
            BorderMode::Replicate => 0.0,
        },
    }
}

fn sample_rgb(img: &RgbImage, x: isize, y: isize, border: BorderMode) -> [f64; 3] {
    let width = img.width() as usize;
    let height = img.height() as usize;
    let raw = img.as_raw();

    match (map_coord(x, width, border), map_coord(y, height, border)) {
        (Some(ix), Some(iy)) => {
            let idx = (iy * width + ix) * 3;
            [raw[idx] as f64, raw[idx + 1] as f64, raw[idx + 2] as f64]
        }
        _ => match border {
            BorderMode::Constant(v) => [v as f64; 3],
            BorderMode::Replicate => [0.0; 3],
        },
    }
}

fn interpolate_gray(src: &GrayImage, x: f64, y: f64, interp: Interpolation, border: BorderMode) -> f64 {
    match interp {
        Interpolation::Nearest => sample_gray(src, x.round() as isize, y.round() as isize, border),
        Interpolation::Linear => {
            let x0 = x.floor() as isize;
            let y0 = y.floor() as isize;
            let fx = x - x0 as f64;
            let fy = y - y0 as f64;

            let v00 = sample_gray(src, x0, y0, border);
            let v10 = sample_gray(src, x0 + 1, y0, border);
            let v01 = sample_gray(src, x0, y0 + 1, border);
            let v11 = sample_gray(src, x0 + 1, y0 + 1, border);

            let v0 = v00 * (1.0 - fx) + v10 * fx;
            let v1 = v01 * (1.0 - fx) + v11 * fx;
            v0 * (1.0 - fy) + v1 * fy
        }
    }
}

fn interpolate_rgb(src: &RgbImage, x: f64, y: f64, interp: Interpolation, border: BorderMode) -> [f64; 3] {
    match interp {
        Interpolation::Nearest => sample_rgb(src, x.round() as isize, y.round() as isize, border),
        Interpolation::Linear => {
            let x0 = x.floor() as isize;
            let y0 = y.floor() as isize;
            let fx = x - x0 as f64;
            let fy = y - y0 as f64;

            let v00 = sample_rgb(src, x0, y0, border);
            let v10 = sample_rgb(src, x0 + 1, y0, border);
            let v01 = sample_rgb(src, x0, y0 + 1, border);
            let v11 = sample_rgb(src, x0 + 1, y0 + 1, border);

            let mut out = [0.0; 3];
            for c in 0..3 {
                let v0 = v00[c] * (1.0 - fx) + v10[c] * fx;
                let v1 = v01[c] * (1.0 - fx) + v11[c] * fx;
                out[c] = v0 * (1.0 - fy) + v1 * fy;
            }
            out
        }
    }
}

/// Warp a grayscale image by a forward affine matrix.
///
/// Warp uses inverse mapping from destination to source coordinates.
pub fn warp_affine(src: &GrayImage, matrix: &AffineMat, width: u32, height: u32) -> Result<GrayImage> {
    warp_affine_ex(
        src,
        matrix,
        width,
        height,
        Interpolation::Linear,
        BorderMode::Constant(0),
    )
}

pub fn warp_affine_ex(
    src: &GrayImage,
    matrix: &AffineMat,
    width: u32,
    height: u32,
    interpolation: Interpolation,
    border: BorderMode,
) -> Result<GrayImage> {
    validate_image_size(width, height)?;
    let inv = invert_affine(matrix)?;

    let mut dst = GrayImage::new(width, height);
    dst.par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                let (sx, sy) = transform_point(&inv, x as f64, y as f64);
                let val = interpolate_gray(src, sx, sy, interpolation, border);
                *out = val.clamp(0.0, 255.0) as u8;
            }
        });

    Ok(dst)
}

/// Warp a color frame by a forward affine matrix.
pub fn warp_affine_rgb(src: &RgbImage, matrix: &AffineMat, width: u32, height: u32) -> Result<RgbImage> {
    warp_affine_rgb_ex(
        src,
        matrix,
        width,
        height,
        Interpolation::Linear,
        BorderMode::Constant(0),
    )
}

pub fn warp_affine_rgb_ex(
    src: &RgbImage,
    matrix: &AffineMat,
    width: u32,
    height: u32,
    interpolation: Interpolation,
    border: BorderMode,
) -> Result<RgbImage> {
    validate_image_size(width, height)?;
    let inv = invert_affine(matrix)?;

    let mut dst = RgbImage::new(width, height);
    dst.par_chunks_mut(width as usize * 3)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..width as usize {
                let (sx, sy) = transform_point(&inv, x as f64, y as f64);
                let val = interpolate_rgb(src, sx, sy, interpolation, border);
                for c in 0..3 {
                    row[x * 3 + c] = val[c].clamp(0.0, 255.0) as u8;
                }
            }
        });

    Ok(dst)
}
