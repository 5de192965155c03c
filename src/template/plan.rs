//! Template statistics precomputed once per scan.

use crate::image::ImageView;
use crate::util::{SceneMatchError, SceneMatchResult};

/// Precomputed template buffers and statistics shared by all metrics.
///
/// Values are kept as `f64` so that sums of integer products stay exact for
/// any template that fits in memory.
#[derive(Clone, Debug)]
pub struct TemplatePlan {
    width: usize,
    height: usize,
    values: Vec<f64>,
    zero_mean: Vec<f64>,
    sum: f64,
    sum_sq: f64,
    zero_mean_sum_sq: f64,
}

impl TemplatePlan {
    /// Builds a plan from a template view.
    pub fn from_view(tpl: ImageView<'_, u8>) -> SceneMatchResult<Self> {
        let width = tpl.width();
        let height = tpl.height();
        let count = width
            .checked_mul(height)
            .ok_or(SceneMatchError::InvalidDimensions { width, height })?;

        let mut values = Vec::with_capacity(count);
        for y in 0..height {
            let row = tpl.row(y).ok_or(SceneMatchError::BufferTooSmall {
                needed: y * tpl.stride() + width,
                got: tpl.as_slice().len(),
            })?;
            values.extend(row.iter().map(|&v| f64::from(v)));
        }

        let sum: f64 = values.iter().sum();
        let sum_sq: f64 = values.iter().map(|v| v * v).sum();
        let mean = sum / count as f64;
        let zero_mean: Vec<f64> = values.iter().map(|v| v - mean).collect();
        let zero_mean_sum_sq = zero_mean.iter().map(|v| v * v).sum();

        Ok(Self {
            width,
            height,
            values,
            zero_mean,
            sum,
            sum_sq,
            zero_mean_sum_sq,
        })
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of template pixels.
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    /// Returns the raw intensities in row-major order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Returns the mean-subtracted intensities in row-major order.
    pub fn zero_mean(&self) -> &[f64] {
        &self.zero_mean
    }

    /// Returns the sum of intensities.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Returns the sum of squared intensities.
    pub fn sum_sq(&self) -> f64 {
        self.sum_sq
    }

    /// Returns the mean intensity.
    pub fn mean(&self) -> f64 {
        self.sum / self.area() as f64
    }

    /// Returns the L2 norm of the raw intensities.
    pub fn norm(&self) -> f64 {
        self.sum_sq.sqrt()
    }

    /// Returns the L2 norm of the mean-subtracted intensities.
    pub fn zero_mean_norm(&self) -> f64 {
        self.zero_mean_sum_sq.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::TemplatePlan;
    use crate::ImageView;

    #[test]
    fn statistics_match_bruteforce() {
        let data = [1u8, 2, 3, 4, 5, 6];
        let view = ImageView::from_slice(&data, 3, 2).unwrap();
        let plan = TemplatePlan::from_view(view).unwrap();
        assert_eq!(plan.area(), 6);
        assert_eq!(plan.sum(), 21.0);
        assert_eq!(plan.sum_sq(), 91.0);
        assert!((plan.mean() - 3.5).abs() < 1e-12);
        assert!(plan.zero_mean().iter().sum::<f64>().abs() < 1e-12);
        assert!((plan.zero_mean_norm() - 17.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn strided_roi_is_packed() {
        let data: Vec<u8> = (0..20).collect();
        let view = ImageView::from_slice(&data, 5, 4).unwrap();
        let roi = view.roi(1, 1, 2, 2).unwrap();
        let plan = TemplatePlan::from_view(roi).unwrap();
        assert_eq!(plan.values(), &[6.0, 7.0, 11.0, 12.0]);
    }

    #[test]
    fn flat_template_has_zero_centered_norm() {
        let data = [9u8; 16];
        let view = ImageView::from_slice(&data, 4, 4).unwrap();
        let plan = TemplatePlan::from_view(view).unwrap();
        assert_eq!(plan.zero_mean_norm(), 0.0);
        assert_eq!(plan.norm(), 36.0);
    }
}
