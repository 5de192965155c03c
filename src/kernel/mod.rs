//! Per-metric score kernels and dense score maps.
//!
//! Every kernel combines the same three ingredients at a placement: the
//! window sum and energy (from integral images) and a cross term with either
//! the raw or the mean-subtracted template (direct dot product).

use crate::image::{ImageView, IntegralImage};
use crate::template::TemplatePlan;

/// Window statistics at one placement.
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowStats {
    /// Sum of intensities under the template.
    pub sum: f64,
    /// Sum of squared intensities under the template.
    pub sum_sq: f64,
}

impl WindowStats {
    /// Reads the window statistics at top-left `(x, y)`.
    #[inline]
    pub fn at(integral: &IntegralImage, x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            sum: integral.box_sum(x, y, x + width, y + height) as f64,
            sum_sq: integral.box_sum_sq(x, y, x + width, y + height) as f64,
        }
    }
}

/// Kernel trait for a single similarity metric.
pub trait Kernel {
    /// Whether the cross term uses the mean-subtracted template.
    const ZERO_MEAN: bool;

    /// Turns a cross term and window statistics into the metric score.
    fn score(cross: f64, window: WindowStats, plan: &TemplatePlan) -> f64;

    /// Computes the score at a single placement (top-left coordinates).
    ///
    /// The caller guarantees the template fits at `(x, y)`.
    fn score_at(
        image: ImageView<'_, u8>,
        integral: &IntegralImage,
        plan: &TemplatePlan,
        x: usize,
        y: usize,
    ) -> f64 {
        let window = WindowStats::at(integral, x, y, plan.width(), plan.height());
        Self::score(cross_term::<Self>(image, plan, x, y), window, plan)
    }
}

/// Dot product between the window at `(x, y)` and the kernel's template buffer.
#[inline]
pub(crate) fn cross_term<K: Kernel + ?Sized>(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
    x: usize,
    y: usize,
) -> f64 {
    let tpl = if K::ZERO_MEAN {
        plan.zero_mean()
    } else {
        plan.values()
    };
    let width = plan.width();
    let mut acc = 0.0f64;
    for (ty, tpl_row) in tpl.chunks_exact(width).enumerate() {
        let Some(row) = image.row(y + ty) else {
            break;
        };
        acc += row[x..x + width]
            .iter()
            .zip(tpl_row)
            .map(|(&v, &t)| f64::from(v) * t)
            .sum::<f64>();
    }
    acc
}

/// Normalizes `num` by `t`, saturating near the boundary.
///
/// Values within 12.5% past the normalizer clamp to ±1; anything further is
/// treated as numerically meaningless and replaced by `fallback`.
#[inline]
pub(crate) fn normalize(num: f64, t: f64, fallback: f64) -> f64 {
    if num.abs() < t {
        num / t
    } else if num.abs() < t * 1.125 {
        if num > 0.0 {
            1.0
        } else {
            -1.0
        }
    } else {
        fallback
    }
}

/// Dense map of scores over every valid placement, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreMap {
    width: usize,
    height: usize,
    data: Vec<f64>,
}

impl ScoreMap {
    pub(crate) fn from_parts(width: usize, height: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            width,
            height,
            data,
        }
    }

    /// Number of horizontal placements.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of vertical placements.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Score at placement `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// Scores in row-major order.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Iterates `(x, y, score)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let width = self.width;
        self.data
            .iter()
            .enumerate()
            .map(move |(i, &s)| (i % width, i / width, s))
    }
}

pub mod scalar;

#[cfg(feature = "rayon")]
pub mod rayon;

#[cfg(test)]
mod tests {
    use super::normalize;

    #[test]
    fn normalize_guards_the_boundary() {
        assert_eq!(normalize(5.0, 10.0, 0.0), 0.5);
        assert_eq!(normalize(10.5, 10.0, 0.0), 1.0);
        assert_eq!(normalize(-10.5, 10.0, 0.0), -1.0);
        assert_eq!(normalize(20.0, 10.0, 0.0), 0.0);
        assert_eq!(normalize(0.0, 0.0, 1.0), 1.0);
    }
}
