//! Mathematical helpers for orientation assignment and weighting.

use std::f32::consts::TAU;

/// Wraps an angle in radians to the range [0, 2π).
pub(crate) fn wrap_tau(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Returns the direction of `(dx, dy)` in [0, 2π).
pub(crate) fn direction(dx: f32, dy: f32) -> f32 {
    wrap_tau(dy.atan2(dx))
}

/// Unnormalized isotropic Gaussian weight at offset `(dx, dy)`.
pub(crate) fn gaussian_weight(dx: f32, dy: f32, sigma: f32) -> f32 {
    let inv = 1.0 / (2.0 * sigma * sigma);
    (-(dx * dx + dy * dy) * inv).exp()
}

/// Rounds to the nearest integer, halves away from zero.
pub(crate) fn round_i32(value: f32) -> i32 {
    value.round() as i32
}

#[cfg(test)]
mod tests {
    use super::{direction, gaussian_weight, round_i32, wrap_tau};
    use std::f32::consts::{PI, TAU};

    #[test]
    fn wrap_tau_maps_to_expected_range() {
        assert!((wrap_tau(-PI / 2.0) - 1.5 * PI).abs() < 1e-5);
        assert!((wrap_tau(TAU + 0.25) - 0.25).abs() < 1e-5);
        assert!(wrap_tau(0.0).abs() < 1e-6);
    }

    #[test]
    fn direction_matches_quadrants() {
        assert!(direction(1.0, 0.0).abs() < 1e-6);
        assert!((direction(0.0, 1.0) - PI / 2.0).abs() < 1e-6);
        assert!((direction(0.0, -1.0) - 1.5 * PI).abs() < 1e-5);
    }

    #[test]
    fn gaussian_weight_peaks_at_origin() {
        assert!((gaussian_weight(0.0, 0.0, 2.0) - 1.0).abs() < 1e-6);
        assert!(gaussian_weight(3.0, 0.0, 2.0) < gaussian_weight(1.0, 0.0, 2.0));
    }

    #[test]
    fn round_i32_rounds_half_away_from_zero() {
        assert_eq!(round_i32(2.5), 3);
        assert_eq!(round_i32(-2.5), -3);
        assert_eq!(round_i32(1.49), 1);
    }
}
