//! Exhaustive template search over every placement in the scene.

pub(crate) mod scan;

use crate::util::{SceneMatchError, SceneMatchResult};

pub use scan::{scan_template, score_map};

/// Similarity metric used by the template scanner.
///
/// Integer codes follow the common OpenCV numbering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Sum of squared differences (code 0).
    SqDiff,
    /// Normalized sum of squared differences (code 1).
    SqDiffNormed,
    /// Cross-correlation (code 2).
    CCorr,
    /// Normalized cross-correlation (code 3).
    CCorrNormed,
    /// Cross-correlation with the mean-subtracted template (code 4).
    CCoeff,
    /// Zero-mean normalized cross-correlation (code 5).
    CCoeffNormed,
}

/// Direction in which a metric's scores improve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Polarity {
    /// Smaller scores are better matches.
    LowerIsBetter,
    /// Larger scores are better matches.
    HigherIsBetter,
}

impl Polarity {
    /// Returns `true` when `score` passes `threshold` in this direction.
    #[inline]
    pub fn passes(self, score: f64, threshold: f64) -> bool {
        match self {
            Polarity::LowerIsBetter => score <= threshold,
            Polarity::HigherIsBetter => score >= threshold,
        }
    }

    /// Returns `true` when `a` is strictly better than `b`.
    #[inline]
    pub fn is_better(self, a: f64, b: f64) -> bool {
        match self {
            Polarity::LowerIsBetter => a < b,
            Polarity::HigherIsBetter => a > b,
        }
    }
}

impl Metric {
    /// All metrics in code order.
    pub const ALL: [Metric; 6] = [
        Metric::SqDiff,
        Metric::SqDiffNormed,
        Metric::CCorr,
        Metric::CCorrNormed,
        Metric::CCoeff,
        Metric::CCoeffNormed,
    ];

    /// Parses an integer metric code.
    pub fn from_code(code: i32) -> SceneMatchResult<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(SceneMatchError::UnknownMetric(code))
    }

    /// Returns the integer code of this metric.
    pub fn code(self) -> i32 {
        match self {
            Metric::SqDiff => 0,
            Metric::SqDiffNormed => 1,
            Metric::CCorr => 2,
            Metric::CCorrNormed => 3,
            Metric::CCoeff => 4,
            Metric::CCoeffNormed => 5,
        }
    }

    /// Returns `true` for the squared-difference metrics.
    pub fn is_sq_diff(self) -> bool {
        matches!(self, Metric::SqDiff | Metric::SqDiffNormed)
    }

    /// Returns the direction in which scores improve.
    pub fn polarity(self) -> Polarity {
        if self.is_sq_diff() {
            Polarity::LowerIsBetter
        } else {
            Polarity::HigherIsBetter
        }
    }
}

impl TryFrom<i32> for Metric {
    type Error = SceneMatchError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

/// A placement of the object in the scene with its score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TemplateBox {
    /// Left edge in scene pixels.
    pub x: usize,
    /// Top edge in scene pixels.
    pub y: usize,
    /// Object width.
    pub width: usize,
    /// Object height.
    pub height: usize,
    /// Metric score at this placement.
    pub confidence: f64,
}

impl TemplateBox {
    /// Area in pixels.
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    /// Intersection over union with `other`; 0 when both boxes are empty.
    pub fn iou(&self, other: &TemplateBox) -> f64 {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = (self.x + self.width).min(other.x + other.width);
        let y1 = (self.y + self.height).min(other.y + other.height);
        let inter = x1.saturating_sub(x0) * y1.saturating_sub(y0);
        let union = self.area() + other.area() - inter;
        if union == 0 {
            return 0.0;
        }
        inter as f64 / union as f64
    }
}

/// Scan summary for one object over the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateScan {
    /// Largest score anywhere in the map, regardless of polarity.
    pub max_confidence: f64,
    /// Best placement under the metric's polarity; first in row-major order on ties.
    pub best: TemplateBox,
    /// Every placement passing the threshold, in row-major order.
    pub matches: Vec<TemplateBox>,
}

#[cfg(test)]
mod tests {
    use super::{Metric, Polarity, TemplateBox};

    #[test]
    fn metric_codes_roundtrip() {
        for m in Metric::ALL {
            assert_eq!(Metric::from_code(m.code()).unwrap(), m);
        }
        assert!(Metric::from_code(6).is_err());
        assert!(Metric::from_code(-1).is_err());
    }

    #[test]
    fn polarity_follows_metric_family() {
        assert_eq!(Metric::SqDiff.polarity(), Polarity::LowerIsBetter);
        assert_eq!(Metric::SqDiffNormed.polarity(), Polarity::LowerIsBetter);
        assert_eq!(Metric::CCorrNormed.polarity(), Polarity::HigherIsBetter);
        assert!(Polarity::LowerIsBetter.passes(0.0, 0.0));
        assert!(!Polarity::LowerIsBetter.passes(0.1, 0.0));
        assert!(Polarity::HigherIsBetter.passes(0.9, 0.8));
    }

    #[test]
    fn iou_of_boxes() {
        let a = TemplateBox { x: 0, y: 0, width: 10, height: 10, confidence: 1.0 };
        let b = TemplateBox { x: 5, y: 0, width: 10, height: 10, confidence: 1.0 };
        let c = TemplateBox { x: 20, y: 20, width: 10, height: 10, confidence: 1.0 };
        assert!((a.iou(&b) - 50.0 / 150.0).abs() < 1e-12);
        assert_eq!(a.iou(&c), 0.0);
        assert_eq!(a.iou(&a), 1.0);
    }
}
