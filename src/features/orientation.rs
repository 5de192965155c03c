//! Dominant orientation from Gaussian-weighted Haar wavelet responses.

use crate::features::hessian::{haar_response, resize_pattern};
use crate::image::IntegralImage;
use crate::util::math::{direction, gaussian_weight, round_i32};
use std::f32::consts::{PI, TAU};

const ORI_RADIUS: i32 = 6;
const ORI_SIGMA: f32 = 2.5;
const ORI_WINDOW: f32 = PI / 3.0;
const ORI_SEARCH_STEPS: usize = 72;

const HAAR_X_4: [[i32; 5]; 2] = [[0, 0, 2, 4, -1], [2, 0, 4, 4, 1]];
const HAAR_Y_4: [[i32; 5]; 2] = [[0, 0, 4, 2, -1], [0, 2, 4, 4, 1]];

/// Returns the dominant gradient direction in radians, in `[0, 2π)`.
///
/// Samples lie on a disc of radius `6 * scale`; the wavelet side is
/// `4 * scale`. A window of 60 degrees slides in 5 degree steps and the window
/// with the longest summed response vector wins; the first one wins ties.
pub(crate) fn dominant_orientation(integral: &IntegralImage, x: f32, y: f32, scale: f32) -> f32 {
    let wavelet = (2 * round_i32(2.0 * scale)).max(2) as usize;
    let dx_pattern = resize_pattern(&HAAR_X_4, 4, wavelet);
    let dy_pattern = resize_pattern(&HAAR_Y_4, 4, wavelet);
    let offset = (wavelet as f32 - 1.0) * 0.5;
    let max_x = integral.width() as i32 - wavelet as i32;
    let max_y = integral.height() as i32 - wavelet as i32;

    let mut responses: Vec<(f32, f32, f32)> = Vec::new();
    for i in -ORI_RADIUS..=ORI_RADIUS {
        for j in -ORI_RADIUS..=ORI_RADIUS {
            if i * i + j * j > ORI_RADIUS * ORI_RADIUS {
                continue;
            }
            let px = round_i32(x + j as f32 * scale - offset);
            let py = round_i32(y + i as f32 * scale - offset);
            if px < 0 || py < 0 || px > max_x || py > max_y {
                continue;
            }
            let w = gaussian_weight(j as f32, i as f32, ORI_SIGMA);
            let rx = w * haar_response(integral, &dx_pattern, px as usize, py as usize);
            let ry = w * haar_response(integral, &dy_pattern, px as usize, py as usize);
            responses.push((rx, ry, direction(rx, ry)));
        }
    }

    let mut best = (0.0f32, 0.0f32);
    let mut best_mag = 0.0f32;
    for k in 0..ORI_SEARCH_STEPS {
        let start = k as f32 * TAU / ORI_SEARCH_STEPS as f32;
        let (mut sx, mut sy) = (0.0f32, 0.0f32);
        for &(rx, ry, angle) in &responses {
            let mut d = (angle - start).abs();
            if d > PI {
                d = TAU - d;
            }
            if d < ORI_WINDOW / 2.0 {
                sx += rx;
                sy += ry;
            }
        }
        let mag = sx * sx + sy * sy;
        if mag > best_mag {
            best_mag = mag;
            best = (sx, sy);
        }
    }

    direction(best.0, best.1)
}
