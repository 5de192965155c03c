//! Scalar kernels for the six similarity metrics and a reference scan.

use crate::image::{ImageView, IntegralImage};
use crate::kernel::{cross_term, normalize, Kernel, ScoreMap, WindowStats};
use crate::template::TemplatePlan;

/// Sum of squared differences.
pub struct SqDiff;
/// Sum of squared differences divided by the window and template norms.
pub struct SqDiffNormed;
/// Raw cross-correlation.
pub struct CCorr;
/// Cross-correlation divided by the window and template norms.
pub struct CCorrNormed;
/// Cross-correlation with the mean-subtracted template.
pub struct CCoeff;
/// Zero-mean normalized cross-correlation.
pub struct CCoeffNormed;

#[inline]
fn sq_diff(cross: f64, window: WindowStats, plan: &TemplatePlan) -> f64 {
    (window.sum_sq - 2.0 * cross + plan.sum_sq()).max(0.0)
}

impl Kernel for SqDiff {
    const ZERO_MEAN: bool = false;

    fn score(cross: f64, window: WindowStats, plan: &TemplatePlan) -> f64 {
        sq_diff(cross, window, plan)
    }
}

impl Kernel for SqDiffNormed {
    const ZERO_MEAN: bool = false;

    fn score(cross: f64, window: WindowStats, plan: &TemplatePlan) -> f64 {
        let t = window.sum_sq.max(0.0).sqrt() * plan.norm();
        normalize(sq_diff(cross, window, plan), t, 1.0)
    }
}

impl Kernel for CCorr {
    const ZERO_MEAN: bool = false;

    fn score(cross: f64, _window: WindowStats, _plan: &TemplatePlan) -> f64 {
        cross
    }
}

impl Kernel for CCorrNormed {
    const ZERO_MEAN: bool = false;

    fn score(cross: f64, window: WindowStats, plan: &TemplatePlan) -> f64 {
        let t = window.sum_sq.max(0.0).sqrt() * plan.norm();
        normalize(cross, t, 0.0)
    }
}

impl Kernel for CCoeff {
    const ZERO_MEAN: bool = true;

    fn score(cross: f64, _window: WindowStats, _plan: &TemplatePlan) -> f64 {
        cross
    }
}

impl Kernel for CCoeffNormed {
    const ZERO_MEAN: bool = true;

    fn score(cross: f64, window: WindowStats, plan: &TemplatePlan) -> f64 {
        let n = plan.area() as f64;
        let var = (window.sum_sq - window.sum * window.sum / n).max(0.0);
        let t = var.sqrt() * plan.zero_mean_norm();
        normalize(cross, t, 0.0)
    }
}

/// Scores every placement of `plan` over `image` on the calling thread.
///
/// `integral` must be built from `image` with squares. The caller guarantees
/// the template fits inside the image.
pub fn scan_full<K: Kernel>(
    image: ImageView<'_, u8>,
    integral: &IntegralImage,
    plan: &TemplatePlan,
) -> ScoreMap {
    let nx = image.width() - plan.width() + 1;
    let ny = image.height() - plan.height() + 1;
    let mut data = vec![0.0f64; nx * ny];
    for (y, row) in data.chunks_exact_mut(nx).enumerate() {
        score_row::<K>(image, integral, plan, y, row);
    }
    ScoreMap::from_parts(nx, ny, data)
}

/// Fills one row of placements at vertical offset `y`.
#[inline]
pub(crate) fn score_row<K: Kernel>(
    image: ImageView<'_, u8>,
    integral: &IntegralImage,
    plan: &TemplatePlan,
    y: usize,
    out: &mut [f64],
) {
    for (x, slot) in out.iter_mut().enumerate() {
        let window = WindowStats::at(integral, x, y, plan.width(), plan.height());
        *slot = K::score(cross_term::<K>(image, plan, x, y), window, plan);
    }
}
