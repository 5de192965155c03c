//! Geometric verification of feature correspondences.
//!
//! A homography is fitted with RANSAC between object and scene points and the
//! object's bounding corners are projected into the scene.

pub mod homography;
pub mod ransac;

use crate::matching::Correspondence;
use crate::util::{SceneMatchError, SceneMatchResult};
use nalgebra::Matrix3;

pub use homography::{estimate_homography_dlt, project, reprojection_error};
pub use ransac::{fit_homography_ransac, fit_homography_ransac_with_rng, RansacConfig, RansacHomography};

/// Fewest good correspondences that justify fitting a homography.
pub const MIN_CORRESPONDENCES: usize = 10;

/// Outcome of verifying one object against the scene.
#[derive(Clone, Debug)]
pub enum Verification {
    /// Fewer than [`MIN_CORRESPONDENCES`] good matches were available.
    InsufficientMatches {
        /// Number of good matches found.
        count: usize,
    },
    /// A homography was fitted and the object corners projected.
    Located {
        /// Projected corners in the order top-left, top-right, bottom-right, bottom-left.
        corners: [[f64; 2]; 4],
        /// Object-to-scene homography.
        homography: Matrix3<f64>,
        /// Number of RANSAC inliers.
        inliers: usize,
    },
}

/// Fits an object-to-scene homography and projects the object bounds.
///
/// `width` and `height` are the object image dimensions. The bounding corners
/// are `(0,0)`, `(w,0)`, `(w,h)` and `(0,h)`.
pub fn verify(
    correspondences: &[Correspondence],
    width: usize,
    height: usize,
    config: &RansacConfig,
) -> SceneMatchResult<Verification> {
    if correspondences.len() < MIN_CORRESPONDENCES {
        return Ok(Verification::InsufficientMatches {
            count: correspondences.len(),
        });
    }
    let (src, dst): (Vec<[f64; 2]>, Vec<[f64; 2]>) = correspondences
        .iter()
        .map(|c| (c.object, c.scene))
        .unzip();
    let fit = fit_homography_ransac(&src, &dst, config)?;
    let corners = project_corners(&fit.h, width, height)?;
    Ok(Verification::Located {
        corners,
        homography: fit.h,
        inliers: fit.n_inliers,
    })
}

/// Projects the four object bounding corners through `h`.
pub fn project_corners(
    h: &Matrix3<f64>,
    width: usize,
    height: usize,
) -> SceneMatchResult<[[f64; 2]; 4]> {
    let (w, h_px) = (width as f64, height as f64);
    let src = [[0.0, 0.0], [w, 0.0], [w, h_px], [0.0, h_px]];
    let mut out = [[0.0; 2]; 4];
    for (dst, s) in out.iter_mut().zip(src.iter()) {
        let p = project(h, s[0], s[1]);
        if !(p[0].is_finite() && p[1].is_finite()) {
            return Err(SceneMatchError::NonFiniteProjection);
        }
        *dst = p;
    }
    Ok(out)
}

/// Match confidence from the good-match count and both keypoint counts.
///
/// Computes `2 * good / (object + scene)` capped at 1. Returns 0 when both
/// keypoint counts are zero.
pub fn feature_confidence(good: usize, object_keypoints: usize, scene_keypoints: usize) -> f64 {
    let total = object_keypoints + scene_keypoints;
    if total == 0 {
        return 0.0;
    }
    ((good as f64) / (total as f64) * 2.0).min(1.0)
}
