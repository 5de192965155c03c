//! Summed-area tables for O(1) box sums.
//!
//! Tables have one extra leading row and column of zeros, so the sum over the
//! half-open rectangle `[x0, x1) x [y0, y1)` is
//! `s(x1, y1) - s(x0, y1) - s(x1, y0) + s(x0, y0)`.

use crate::image::ImageView;

/// Summed-area table of intensities, optionally with squared intensities.
#[derive(Clone, Debug)]
pub struct IntegralImage {
    width: usize,
    height: usize,
    sum: Vec<u64>,
    sum_sq: Option<Vec<u64>>,
}

impl IntegralImage {
    /// Builds the intensity table only.
    pub fn new(image: ImageView<'_, u8>) -> Self {
        Self::build(image, false)
    }

    /// Builds both the intensity and squared-intensity tables.
    pub fn with_squares(image: ImageView<'_, u8>) -> Self {
        Self::build(image, true)
    }

    fn build(image: ImageView<'_, u8>, squares: bool) -> Self {
        let width = image.width();
        let height = image.height();
        let stride = width + 1;
        let mut sum = vec![0u64; stride * (height + 1)];
        let mut sum_sq = squares.then(|| vec![0u64; stride * (height + 1)]);

        for y in 0..height {
            let Some(row) = image.row(y) else {
                break;
            };
            let mut acc = 0u64;
            let mut acc_sq = 0u64;
            let above = y * stride;
            let here = (y + 1) * stride;
            for (x, &value) in row.iter().enumerate() {
                let v = u64::from(value);
                acc += v;
                sum[here + x + 1] = sum[above + x + 1] + acc;
                if let Some(sq) = sum_sq.as_mut() {
                    acc_sq += v * v;
                    sq[here + x + 1] = sq[above + x + 1] + acc_sq;
                }
            }
        }

        Self {
            width,
            height,
            sum,
            sum_sq,
        }
    }

    /// Returns the width of the source image.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height of the source image.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `true` when squared sums are available.
    pub fn has_squares(&self) -> bool {
        self.sum_sq.is_some()
    }

    #[inline]
    fn rect(table: &[u64], stride: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> u64 {
        table[y1 * stride + x1] + table[y0 * stride + x0]
            - table[y0 * stride + x1]
            - table[y1 * stride + x0]
    }

    /// Sum of intensities over `[x0, x1) x [y0, y1)`.
    ///
    /// Coordinates are clamped to the image, so partially outside boxes only
    /// count their inside part.
    #[inline]
    pub fn box_sum(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> u64 {
        let (x0, y0, x1, y1) = self.clamp(x0, y0, x1, y1);
        Self::rect(&self.sum, self.width + 1, x0, y0, x1, y1)
    }

    /// Sum of squared intensities over `[x0, x1) x [y0, y1)`.
    ///
    /// Returns 0 when the table was built without squares.
    #[inline]
    pub fn box_sum_sq(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> u64 {
        let (x0, y0, x1, y1) = self.clamp(x0, y0, x1, y1);
        match &self.sum_sq {
            Some(table) => Self::rect(table, self.width + 1, x0, y0, x1, y1),
            None => 0,
        }
    }

    /// Sum over a box given by signed coordinates, clamped to the image.
    #[inline]
    pub fn box_sum_signed(&self, x0: isize, y0: isize, x1: isize, y1: isize) -> f32 {
        let clamp = |v: isize, max: usize| v.clamp(0, max as isize) as usize;
        let x0 = clamp(x0, self.width);
        let x1 = clamp(x1, self.width);
        let y0 = clamp(y0, self.height);
        let y1 = clamp(y1, self.height);
        if x1 <= x0 || y1 <= y0 {
            return 0.0;
        }
        Self::rect(&self.sum, self.width + 1, x0, y0, x1, y1) as f32
    }

    #[inline]
    fn clamp(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> (usize, usize, usize, usize) {
        let x1 = x1.min(self.width);
        let y1 = y1.min(self.height);
        (x0.min(x1), y0.min(y1), x1, y1)
    }
}

#[cfg(test)]
mod tests {
    use super::IntegralImage;
    use crate::ImageView;

    #[test]
    fn box_sums_match_bruteforce() {
        let width = 7;
        let height = 5;
        let data: Vec<u8> = (0..width * height).map(|i| (i * 37 % 251) as u8).collect();
        let view = ImageView::from_slice(&data, width, height).unwrap();
        let integral = IntegralImage::with_squares(view);

        for (x0, y0, x1, y1) in [(0, 0, 7, 5), (1, 2, 4, 5), (3, 1, 4, 2), (6, 4, 7, 5)] {
            let mut sum = 0u64;
            let mut sum_sq = 0u64;
            for y in y0..y1 {
                for x in x0..x1 {
                    let v = u64::from(data[y * width + x]);
                    sum += v;
                    sum_sq += v * v;
                }
            }
            assert_eq!(integral.box_sum(x0, y0, x1, y1), sum);
            assert_eq!(integral.box_sum_sq(x0, y0, x1, y1), sum_sq);
        }
    }

    #[test]
    fn signed_boxes_are_clamped() {
        let data = [1u8; 16];
        let view = ImageView::from_slice(&data, 4, 4).unwrap();
        let integral = IntegralImage::new(view);
        assert_eq!(integral.box_sum_signed(-2, -2, 2, 2), 4.0);
        assert_eq!(integral.box_sum_signed(3, 3, 10, 10), 1.0);
        assert_eq!(integral.box_sum_signed(5, 5, 10, 10), 0.0);
        assert!(!integral.has_squares());
    }
}
