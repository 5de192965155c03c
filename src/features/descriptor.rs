//! Oriented 4x4 sub-region descriptor.
//!
//! A 21x21 grid of intensities is sampled around the keypoint in its rotated
//! frame with spacing `scale`. Finite differences on the grid give 20x20
//! rotated gradients, Gaussian weighted (σ = 3.3 grid cells) and pooled into
//! 4x4 sub-regions of 5x5 cells.

use crate::features::Keypoint;
use crate::image::{ImageView, IntegralImage};
use crate::util::math::gaussian_weight;

const PATCH: usize = 20;
const SUB: usize = 5;
const DESC_SIGMA: f32 = 3.3;

/// Writes the normalized descriptor of `kp` into `out`.
///
/// `out.len()` must be 64, or 128 when `extended` is set.
pub(crate) fn compute(
    image: ImageView<'_, u8>,
    integral: &IntegralImage,
    kp: &Keypoint,
    scale: f32,
    theta: f32,
    extended: bool,
    out: &mut [f32],
) {
    let (sin, cos) = theta.sin_cos();
    let half = PATCH as f32 / 2.0;
    let mut patch = [[0.0f32; PATCH + 1]; PATCH + 1];
    for (r, row) in patch.iter_mut().enumerate() {
        let v = (r as f32 - half) * scale;
        for (c, cell) in row.iter_mut().enumerate() {
            let u = (c as f32 - half) * scale;
            let px = kp.x + u * cos - v * sin;
            let py = kp.y + u * sin + v * cos;
            *cell = sample(image, integral, px, py, scale);
        }
    }

    out.iter_mut().for_each(|v| *v = 0.0);
    let center = (PATCH as f32 - 1.0) / 2.0;
    let per_region = if extended { 8 } else { 4 };
    for i in 0..PATCH {
        for j in 0..PATCH {
            let w = gaussian_weight(j as f32 - center, i as f32 - center, DESC_SIGMA);
            let tx = (patch[i][j + 1] - patch[i][j] + patch[i + 1][j + 1] - patch[i + 1][j]) * w;
            let ty = (patch[i + 1][j] - patch[i][j] + patch[i + 1][j + 1] - patch[i][j + 1]) * w;
            let base = ((i / SUB) * (PATCH / SUB) + j / SUB) * per_region;
            let cell = &mut out[base..base + per_region];
            if extended {
                if ty >= 0.0 {
                    cell[0] += tx;
                    cell[1] += tx.abs();
                } else {
                    cell[2] += tx;
                    cell[3] += tx.abs();
                }
                if tx >= 0.0 {
                    cell[4] += ty;
                    cell[5] += ty.abs();
                } else {
                    cell[6] += ty;
                    cell[7] += ty.abs();
                }
            } else {
                cell[0] += tx;
                cell[1] += ty;
                cell[2] += tx.abs();
                cell[3] += ty.abs();
            }
        }
    }

    let norm = out.iter().map(|v| v * v).sum::<f32>().sqrt();
    let inv = 1.0 / (norm + f32::EPSILON);
    out.iter_mut().for_each(|v| *v *= inv);
}

/// Intensity at a sub-pixel location, area-averaged when `scale` exceeds 1.5.
///
/// Locations outside the image are clamped to the border.
fn sample(image: ImageView<'_, u8>, integral: &IntegralImage, x: f32, y: f32, scale: f32) -> f32 {
    let max_x = (image.width() - 1) as f32;
    let max_y = (image.height() - 1) as f32;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    if scale > 1.5 {
        let side = scale.round() as isize;
        let x0 = (x - scale / 2.0).round() as isize;
        let y0 = (y - scale / 2.0).round() as isize;
        let x1 = (x0 + side).min(image.width() as isize);
        let y1 = (y0 + side).min(image.height() as isize);
        let (x0, y0) = (x0.max(0), y0.max(0));
        let area = ((x1 - x0) * (y1 - y0)) as f32;
        if area > 0.0 {
            return integral.box_sum_signed(x0, y0, x1, y1) / area;
        }
    }

    bilinear(image, x, y)
}

fn bilinear(image: ImageView<'_, u8>, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(image.width() - 1);
    let y1 = (y0 + 1).min(image.height() - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    let px = |xx: usize, yy: usize| image.get(xx, yy).copied().map_or(0.0, f32::from);
    let top = px(x0, y0) * (1.0 - fx) + px(x1, y0) * fx;
    let bottom = px(x0, y1) * (1.0 - fx) + px(x1, y1) * fx;
    top * (1.0 - fy) + bottom * fy
}
