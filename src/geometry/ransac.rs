//! RANSAC homography fitting with a pluggable random source.

use crate::geometry::homography::{estimate_homography_dlt, reprojection_error};
use crate::trace::{trace_event, trace_span};
use crate::util::{SceneMatchError, SceneMatchResult};
use nalgebra::Matrix3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SAMPLE_SIZE: usize = 4;
const MAX_SAMPLE_ATTEMPTS: usize = 100;

/// RANSAC configuration for homography fitting.
#[derive(Clone, Debug)]
pub struct RansacConfig {
    /// Upper bound on the number of hypotheses.
    pub max_iters: usize,
    /// Maximum reprojection error in pixels for an inlier.
    pub reproj_threshold: f64,
    /// Desired probability of drawing at least one all-inlier sample.
    pub confidence: f64,
    /// Seed for the default random source.
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_iters: 2000,
            reproj_threshold: 3.0,
            confidence: 0.995,
            seed: 0,
        }
    }
}

impl RansacConfig {
    /// Validates configuration parameters.
    pub fn validate(&self) -> SceneMatchResult<()> {
        if self.max_iters == 0 {
            return Err(SceneMatchError::InvalidInput("max_iters must be at least 1"));
        }
        if !(self.reproj_threshold.is_finite() && self.reproj_threshold > 0.0) {
            return Err(SceneMatchError::InvalidInput(
                "reproj_threshold must be positive",
            ));
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(SceneMatchError::InvalidInput(
                "confidence must be in (0, 1)",
            ));
        }
        Ok(())
    }
}

/// Result of RANSAC homography fitting.
#[derive(Clone, Debug)]
pub struct RansacHomography {
    /// The fitted homography, refined on all inliers.
    pub h: Matrix3<f64>,
    /// `true` for correspondences within the reprojection threshold.
    pub inlier_mask: Vec<bool>,
    /// Number of inliers under `h`.
    pub n_inliers: usize,
    /// Number of hypotheses evaluated.
    pub iterations: usize,
}

/// Fits a homography with RANSAC using a generator seeded from `config.seed`.
pub fn fit_homography_ransac(
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
    config: &RansacConfig,
) -> SceneMatchResult<RansacHomography> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    fit_homography_ransac_with_rng(src, dst, config, &mut rng)
}

/// Fits a homography with RANSAC, drawing samples from `rng`.
///
/// Minimal samples whose points are collinear, or whose triangles change
/// orientation between `src` and `dst`, are redrawn. The hypothesis with the
/// most inliers wins; on equal counts the earlier one is kept.
pub fn fit_homography_ransac_with_rng<R: Rng + ?Sized>(
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
    config: &RansacConfig,
    rng: &mut R,
) -> SceneMatchResult<RansacHomography> {
    config.validate()?;
    if src.len() != dst.len() {
        return Err(SceneMatchError::InvalidInput(
            "src and dst must have the same length",
        ));
    }
    let n = src.len();
    if n < SAMPLE_SIZE {
        return Err(SceneMatchError::DegenerateHomography {
            reason: "at least 4 correspondences are required",
        });
    }

    let _span = trace_span!("ransac", points = n).entered();

    let mut best: Option<(Matrix3<f64>, Vec<bool>, usize)> = None;
    let mut max_iters = config.max_iters;
    let mut iter = 0usize;
    let mut mask = vec![false; n];
    let mut s4 = [[0.0f64; 2]; SAMPLE_SIZE];
    let mut d4 = [[0.0f64; 2]; SAMPLE_SIZE];

    while iter < max_iters {
        iter += 1;

        let mut found = false;
        for _ in 0..MAX_SAMPLE_ATTEMPTS {
            let indices = rand::seq::index::sample(rng, n, SAMPLE_SIZE);
            for (k, idx) in indices.iter().enumerate() {
                s4[k] = src[idx];
                d4[k] = dst[idx];
            }
            if is_good_sample(&s4, &d4) {
                found = true;
                break;
            }
        }
        if !found {
            continue;
        }

        let Ok(h) = estimate_homography_dlt(&s4, &d4) else {
            continue;
        };

        let count = count_inliers(&h, src, dst, config.reproj_threshold, &mut mask);
        let improves = best.as_ref().map_or(true, |(_, _, c)| count > *c);
        if improves {
            best = Some((h, mask.clone(), count));
            max_iters = update_num_iters(config.confidence, (n - count) as f64 / n as f64, max_iters);
        }
    }

    let Some((best_h, best_mask, _)) = best else {
        return Err(SceneMatchError::DegenerateHomography {
            reason: "no non-degenerate minimal sample",
        });
    };

    let inlier_src: Vec<[f64; 2]> = (0..n).filter(|&i| best_mask[i]).map(|i| src[i]).collect();
    let inlier_dst: Vec<[f64; 2]> = (0..n).filter(|&i| best_mask[i]).map(|i| dst[i]).collect();
    let h = estimate_homography_dlt(&inlier_src, &inlier_dst).unwrap_or(best_h);

    let mut final_mask = vec![false; n];
    let mut n_inliers = count_inliers(&h, src, dst, config.reproj_threshold, &mut final_mask);
    let h = if n_inliers < inlier_src.len() {
        // Refit drifted; keep the hypothesis that had more support.
        n_inliers = count_inliers(&best_h, src, dst, config.reproj_threshold, &mut final_mask);
        best_h
    } else {
        h
    };

    trace_event!("ransac_done", iterations = iter, inliers = n_inliers);
    Ok(RansacHomography {
        h,
        inlier_mask: final_mask,
        n_inliers,
        iterations: iter,
    })
}

fn count_inliers(
    h: &Matrix3<f64>,
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
    threshold: f64,
    mask: &mut [bool],
) -> usize {
    let mut count = 0;
    for (i, (s, d)) in src.iter().zip(dst).enumerate() {
        let err = reprojection_error(h, s, d);
        mask[i] = err <= threshold;
        if mask[i] {
            count += 1;
        }
    }
    count
}

/// Signed doubled area of the triangle `(a, b, c)`.
fn cross(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

/// Rejects samples with collinear triples or inconsistent orientation.
fn is_good_sample(src: &[[f64; 2]; 4], dst: &[[f64; 2]; 4]) -> bool {
    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    for [i, j, k] in TRIPLES {
        let cs = cross(src[i], src[j], src[k]);
        let cd = cross(dst[i], dst[j], dst[k]);
        if cs.abs() < 1e-6 || cd.abs() < 1e-6 {
            return false;
        }
        if cs.signum() != cd.signum() {
            return false;
        }
    }
    true
}

/// Number of iterations needed to reach `confidence` at the given outlier ratio.
fn update_num_iters(confidence: f64, outlier_ratio: f64, max_iters: usize) -> usize {
    let outlier_ratio = outlier_ratio.clamp(0.0, 1.0);
    let num = (1.0 - confidence).max(f64::MIN_POSITIVE);
    let denom = 1.0 - (1.0 - outlier_ratio).powi(SAMPLE_SIZE as i32);
    if denom < f64::MIN_POSITIVE {
        return 0;
    }
    let num = num.ln();
    let denom = denom.ln();
    if denom >= 0.0 || -num >= max_iters as f64 * -denom {
        max_iters
    } else {
        (num / denom).round() as usize
    }
}
