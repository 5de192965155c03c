//! Homography estimation via DLT with Hartley normalization.

use crate::util::{SceneMatchError, SceneMatchResult};
use nalgebra::{DMatrix, Matrix3, SymmetricEigen, Vector3};

/// Projects a 2D point through a 3x3 homography.
///
/// Returns NaN coordinates when the point maps to infinity.
pub fn project(h: &Matrix3<f64>, x: f64, y: f64) -> [f64; 2] {
    let p = h * Vector3::new(x, y, 1.0);
    if p[2].abs() < f64::EPSILON {
        return [f64::NAN, f64::NAN];
    }
    [p[0] / p[2], p[1] / p[2]]
}

/// Euclidean distance between `project(h, src)` and `dst`.
pub fn reprojection_error(h: &Matrix3<f64>, src: &[f64; 2], dst: &[f64; 2]) -> f64 {
    let p = project(h, src[0], src[1]);
    let dx = p[0] - dst[0];
    let dy = p[1] - dst[1];
    (dx * dx + dy * dy).sqrt()
}

/// Translates the centroid to the origin and scales the mean distance to √2.
fn normalize_points(pts: &[[f64; 2]]) -> (Matrix3<f64>, Vec<[f64; 2]>) {
    let n = pts.len() as f64;
    let cx = pts.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy = pts.iter().map(|p| p[1]).sum::<f64>() / n;
    let mean_dist = pts
        .iter()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = pts
        .iter()
        .map(|p| [s * (p[0] - cx), s * (p[1] - cy)])
        .collect();
    (t, normalized)
}

/// Estimates `H` with `dst ≈ project(H, src)` from at least 4 correspondences.
///
/// The solution is the eigenvector of `AᵀA` with the smallest eigenvalue,
/// denormalized and scaled so `H[2][2] == 1` when that entry is not zero.
pub fn estimate_homography_dlt(
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
) -> SceneMatchResult<Matrix3<f64>> {
    if src.len() != dst.len() {
        return Err(SceneMatchError::InvalidInput(
            "src and dst must have the same length",
        ));
    }
    let n = src.len();
    if n < 4 {
        return Err(SceneMatchError::DegenerateHomography {
            reason: "at least 4 correspondences are required",
        });
    }

    let (t_src, src_n) = normalize_points(src);
    let (t_dst, dst_n) = normalize_points(dst);

    let mut a = DMatrix::<f64>::zeros(2 * n, 9);
    for i in 0..n {
        let [sx, sy] = src_n[i];
        let [dx, dy] = dst_n[i];

        a[(2 * i, 3)] = -sx;
        a[(2 * i, 4)] = -sy;
        a[(2 * i, 5)] = -1.0;
        a[(2 * i, 6)] = dy * sx;
        a[(2 * i, 7)] = dy * sy;
        a[(2 * i, 8)] = dy;

        a[(2 * i + 1, 0)] = sx;
        a[(2 * i + 1, 1)] = sy;
        a[(2 * i + 1, 2)] = 1.0;
        a[(2 * i + 1, 6)] = -dx * sx;
        a[(2 * i + 1, 7)] = -dx * sy;
        a[(2 * i + 1, 8)] = -dx;
    }

    let ata = a.transpose() * &a;
    let eig = SymmetricEigen::new(ata);
    let mut min_idx = 0;
    for i in 1..9 {
        if eig.eigenvalues[i].abs() < eig.eigenvalues[min_idx].abs() {
            min_idx = i;
        }
    }
    let v = eig.eigenvectors.column(min_idx);
    let h_norm = Matrix3::new(v[0], v[1], v[2], v[3], v[4], v[5], v[6], v[7], v[8]);

    let t_dst_inv = t_dst
        .try_inverse()
        .ok_or(SceneMatchError::DegenerateHomography {
            reason: "destination normalization is not invertible",
        })?;
    let h = t_dst_inv * h_norm * t_src;
    if !h.iter().all(|v| v.is_finite()) {
        return Err(SceneMatchError::DegenerateHomography {
            reason: "non-finite homography",
        });
    }

    let scale = h[(2, 2)];
    if scale.abs() < f64::EPSILON {
        Ok(h)
    } else {
        Ok(h / scale)
    }
}
