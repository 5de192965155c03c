//! Box-filter Hessian responses and scale-space extremum detection.

use crate::features::{Keypoint, SurfConfig};
use crate::image::IntegralImage;
use nalgebra::{Matrix3, Vector3};

const HAAR_SIZE0: usize = 9;
const HAAR_SIZE_INC: usize = 6;
/// Relative weight of the mixed derivative in the determinant.
const DXY_WEIGHT: f32 = 0.81;

// Base 9x9 patterns: (x0, y0, x1, y1, weight), half-open boxes.
const DXX_9: [[i32; 5]; 3] = [[0, 2, 3, 7, 1], [3, 2, 6, 7, -2], [6, 2, 9, 7, 1]];
const DYY_9: [[i32; 5]; 3] = [[2, 0, 7, 3, 1], [2, 3, 7, 6, -2], [2, 6, 7, 9, 1]];
const DXY_9: [[i32; 5]; 4] = [
    [1, 1, 4, 4, 1],
    [5, 1, 8, 4, -1],
    [1, 5, 4, 8, -1],
    [5, 5, 8, 8, 1],
];

/// One weighted box of a Haar-like pattern, weight pre-divided by its area.
#[derive(Clone, Copy, Debug)]
pub(crate) struct HaarBox {
    x0: usize,
    y0: usize,
    x1: usize,
    y1: usize,
    weight: f32,
}

/// Scales a base pattern from `old_size` to `new_size`.
pub(crate) fn resize_pattern(src: &[[i32; 5]], old_size: usize, new_size: usize) -> Vec<HaarBox> {
    let ratio = new_size as f32 / old_size as f32;
    src.iter()
        .map(|&[x0, y0, x1, y1, w]| {
            let scale = |v: i32| (ratio * v as f32).round().max(0.0) as usize;
            let (x0, y0, x1, y1) = (scale(x0), scale(y0), scale(x1), scale(y1));
            let area = ((x1 - x0) * (y1 - y0)).max(1) as f32;
            HaarBox {
                x0,
                y0,
                x1,
                y1,
                weight: w as f32 / area,
            }
        })
        .collect()
}

/// Evaluates a pattern with its top-left corner at `(x, y)`.
#[inline]
pub(crate) fn haar_response(integral: &IntegralImage, boxes: &[HaarBox], x: usize, y: usize) -> f32 {
    boxes
        .iter()
        .map(|b| b.weight * integral.box_sum(x + b.x0, y + b.y0, x + b.x1, y + b.y1) as f32)
        .sum()
}

/// Determinant-of-Hessian map for one filter size.
///
/// Responses are stored at `(position + size / 2) / step` so maps of the same
/// octave align sample-for-sample.
struct ResponseLayer {
    width: usize,
    height: usize,
    size: usize,
    step: usize,
    dets: Vec<f32>,
}

impl ResponseLayer {
    fn compute(integral: &IntegralImage, size: usize, step: usize) -> Self {
        let img_w = integral.width();
        let img_h = integral.height();
        let width = img_w / step;
        let height = img_h / step;
        let mut dets = vec![0.0f32; width * height];

        if size <= img_w && size <= img_h {
            let dxx = resize_pattern(&DXX_9, HAAR_SIZE0, size);
            let dyy = resize_pattern(&DYY_9, HAAR_SIZE0, size);
            let dxy = resize_pattern(&DXY_9, HAAR_SIZE0, size);
            let samples_y = 1 + (img_h - size) / step;
            let samples_x = 1 + (img_w - size) / step;
            let margin = (size / 2) / step;
            for i in 0..samples_y {
                let y = i * step;
                let row = (i + margin) * width;
                for j in 0..samples_x {
                    let x = j * step;
                    let xx = haar_response(integral, &dxx, x, y);
                    let yy = haar_response(integral, &dyy, x, y);
                    let xy = haar_response(integral, &dxy, x, y);
                    dets[row + j + margin] = xx * yy - DXY_WEIGHT * xy * xy;
                }
            }
        }

        Self {
            width,
            height,
            size,
            step,
            dets,
        }
    }

    #[inline]
    fn at(&self, c: usize, r: usize) -> f32 {
        self.dets[r * self.width + c]
    }

    /// 3x3 neighborhood around `(c, r)` in row-major order.
    fn neighborhood(&self, c: usize, r: usize) -> [f32; 9] {
        let mut out = [0.0f32; 9];
        for (k, v) in out.iter_mut().enumerate() {
            *v = self.at(c + k % 3 - 1, r + k / 3 - 1);
        }
        out
    }
}

/// Detects scale-space maxima of the Hessian determinant.
///
/// Returned keypoints have `angle == 0`; orientation is assigned later.
pub(crate) fn detect(integral: &IntegralImage, threshold: f32, cfg: &SurfConfig) -> Vec<Keypoint> {
    let layers_per_octave = cfg.octave_layers + 2;
    let mut keypoints = Vec::new();

    for octave in 0..cfg.octaves {
        let step = 1usize << octave;
        if integral.width() / step < 3 || integral.height() / step < 3 {
            break;
        }
        let layers: Vec<ResponseLayer> = (0..layers_per_octave)
            .map(|layer| {
                let size = (HAAR_SIZE0 + HAAR_SIZE_INC * layer) << octave;
                ResponseLayer::compute(integral, size, step)
            })
            .collect();

        for mid in 1..=cfg.octave_layers {
            find_maxima(
                &layers[mid - 1],
                &layers[mid],
                &layers[mid + 1],
                threshold,
                octave,
                &mut keypoints,
            );
        }
    }

    keypoints
}

fn find_maxima(
    below: &ResponseLayer,
    layer: &ResponseLayer,
    above: &ResponseLayer,
    threshold: f32,
    octave: usize,
    out: &mut Vec<Keypoint>,
) {
    let step = layer.step;
    let margin = (above.size / 2) / step + 1;
    if layer.width <= 2 * margin || layer.height <= 2 * margin {
        return;
    }

    for r in margin..layer.height - margin {
        for c in margin..layer.width - margin {
            let val = layer.at(c, r);
            if val <= threshold {
                continue;
            }

            let n_below = below.neighborhood(c, r);
            let n_mid = layer.neighborhood(c, r);
            let n_above = above.neighborhood(c, r);
            let is_max = n_below.iter().all(|&v| v < val)
                && n_above.iter().all(|&v| v < val)
                && n_mid
                    .iter()
                    .enumerate()
                    .all(|(k, &v)| k == 4 || v < val);
            if !is_max {
                continue;
            }

            let origin_x = step * (c - (layer.size / 2) / step);
            let origin_y = step * (r - (layer.size / 2) / step);
            let half = (layer.size as f32 - 1.0) * 0.5;
            let mut kp = Keypoint {
                x: origin_x as f32 + half,
                y: origin_y as f32 + half,
                size: layer.size as f32,
                angle: 0.0,
                response: val,
                octave,
            };
            let ds = (layer.size - below.size) as f32;
            if interpolate(&[n_below, n_mid, n_above], step as f32, ds, &mut kp) {
                out.push(kp);
            }
        }
    }
}

/// Refines a maximum with a 3D quadratic fit over `(x, y, scale)`.
///
/// Rejects the point when the system is singular or the offset leaves the
/// unit cube around the sample.
fn interpolate(n: &[[f32; 9]; 3], step: f32, ds: f32, kp: &mut Keypoint) -> bool {
    let b = Vector3::new(
        -(n[1][5] - n[1][3]) / 2.0,
        -(n[1][7] - n[1][1]) / 2.0,
        -(n[2][4] - n[0][4]) / 2.0,
    );
    let dxy = (n[1][8] - n[1][6] - n[1][2] + n[1][0]) / 4.0;
    let dxs = (n[2][5] - n[2][3] - n[0][5] + n[0][3]) / 4.0;
    let dys = (n[2][7] - n[2][1] - n[0][7] + n[0][1]) / 4.0;
    let a = Matrix3::new(
        n[1][3] - 2.0 * n[1][4] + n[1][5],
        dxy,
        dxs,
        dxy,
        n[1][1] - 2.0 * n[1][4] + n[1][7],
        dys,
        dxs,
        dys,
        n[0][4] - 2.0 * n[1][4] + n[2][4],
    );

    let Some(x) = a.lu().solve(&b) else {
        return false;
    };
    if !x.iter().all(|v| v.is_finite() && v.abs() <= 1.0) {
        return false;
    }

    kp.x += x[0] * step;
    kp.y += x[1] * step;
    kp.size = (kp.size + x[2] * ds).round();
    true
}

#[cfg(test)]
mod tests {
    use super::{haar_response, resize_pattern, DXX_9, DXY_9};
    use crate::image::IntegralImage;
    use crate::ImageView;

    #[test]
    fn resized_pattern_weights_balance_on_flat_images() {
        let data = vec![100u8; 40 * 40];
        let view = ImageView::from_slice(&data, 40, 40).unwrap();
        let integral = IntegralImage::new(view);
        for size in [9, 15, 21, 27] {
            let dxx = resize_pattern(&DXX_9, 9, size);
            let dxy = resize_pattern(&DXY_9, 9, size);
            assert!(haar_response(&integral, &dxx, 3, 3).abs() < 1e-3);
            assert!(haar_response(&integral, &dxy, 3, 3).abs() < 1e-3);
        }
    }

    #[test]
    fn dxx_responds_negatively_to_a_bright_vertical_bar() {
        let width = 20;
        let mut data = vec![0u8; width * width];
        for y in 0..width {
            for x in 3..6 {
                data[y * width + x] = 200;
            }
        }
        let view = ImageView::from_slice(&data, width, width).unwrap();
        let integral = IntegralImage::new(view);
        let dxx = resize_pattern(&DXX_9, 9, 9);
        // Center lobe covers columns 3..6 when the window starts at x = 0.
        assert!(haar_response(&integral, &dxx, 0, 5) < -100.0);
    }
}
