//! IoU non-maximum suppression over boxes from one or more templates.

use crate::search::{Polarity, TemplateBox};
use crate::util::{SceneMatchError, SceneMatchResult};
use std::cmp::Ordering;

/// Suppression thresholds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NmsConfig {
    /// Boxes of the same template overlapping a kept box by at least this IoU are dropped.
    pub iou_threshold: f64,
    /// IoU at which boxes of different templates are considered the same detection.
    pub cross_template_iou: f64,
    /// Score ratio past which a stronger box of another template always wins.
    pub confidence_ratio: f64,
}

impl Default for NmsConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.2,
            cross_template_iou: 0.5,
            confidence_ratio: 1.5,
        }
    }
}

impl NmsConfig {
    /// Validates configuration parameters.
    pub fn validate(&self) -> SceneMatchResult<()> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.iou_threshold) || !unit.contains(&self.cross_template_iou) {
            return Err(SceneMatchError::InvalidInput("IoU thresholds must be in [0, 1]"));
        }
        if !(self.confidence_ratio.is_finite() && self.confidence_ratio > 0.0) {
            return Err(SceneMatchError::InvalidInput("confidence_ratio must be positive"));
        }
        Ok(())
    }
}

/// A box tagged with the index of the template that produced it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelledBox {
    /// Index of the source template.
    pub label: usize,
    /// Placement and score.
    pub bbox: TemplateBox,
}

fn cmp_best_first(a: &LabelledBox, b: &LabelledBox, polarity: Polarity) -> Ordering {
    let by_score = match polarity {
        Polarity::HigherIsBetter => b.bbox.confidence.total_cmp(&a.bbox.confidence),
        Polarity::LowerIsBetter => a.bbox.confidence.total_cmp(&b.bbox.confidence),
    };
    by_score
        .then_with(|| a.label.cmp(&b.label))
        .then_with(|| a.bbox.y.cmp(&b.bbox.y))
        .then_with(|| a.bbox.x.cmp(&b.bbox.x))
}

/// How many times better `kept` scores than `other` under `polarity`.
fn score_ratio(kept: f64, other: f64, polarity: Polarity) -> f64 {
    match polarity {
        Polarity::HigherIsBetter => kept / other,
        Polarity::LowerIsBetter => other / kept,
    }
}

/// Greedy IoU suppression, best box first.
///
/// Returns the kept boxes ordered best-first under `polarity`.
pub fn suppress(
    mut boxes: Vec<LabelledBox>,
    polarity: Polarity,
    config: &NmsConfig,
) -> Vec<LabelledBox> {
    boxes.sort_by(|a, b| cmp_best_first(a, b, polarity));
    let mut kept: Vec<LabelledBox> = Vec::new();

    'outer: for candidate in boxes {
        for k in &kept {
            let iou = k.bbox.iou(&candidate.bbox);
            let dominated = if k.label == candidate.label {
                iou >= config.iou_threshold
            } else {
                let ratio = score_ratio(k.bbox.confidence, candidate.bbox.confidence, polarity);
                (iou > config.cross_template_iou && ratio > config.confidence_ratio)
                    || iou >= config.cross_template_iou
            };
            if dominated {
                continue 'outer;
            }
        }
        kept.push(candidate);
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::{suppress, LabelledBox, NmsConfig};
    use crate::search::{Polarity, TemplateBox};

    fn lb(label: usize, x: usize, y: usize, confidence: f64) -> LabelledBox {
        LabelledBox {
            label,
            bbox: TemplateBox {
                x,
                y,
                width: 10,
                height: 10,
                confidence,
            },
        }
    }

    #[test]
    fn same_template_overlaps_collapse() {
        let boxes = vec![lb(0, 0, 0, 0.9), lb(0, 1, 0, 0.95), lb(0, 50, 50, 0.85)];
        let kept = suppress(boxes, Polarity::HigherIsBetter, &NmsConfig::default());
        assert_eq!(kept.len(), 2);
        assert_eq!((kept[0].bbox.x, kept[0].bbox.confidence), (1, 0.95));
        assert_eq!(kept[1].bbox.x, 50);
    }

    #[test]
    fn different_templates_tolerate_small_overlap() {
        // IoU of a 3px shift is 70/130, of a 6px shift 40/160.
        let boxes = vec![lb(0, 0, 0, 0.9), lb(1, 6, 0, 0.88), lb(2, 3, 0, 0.89)];
        let kept = suppress(boxes, Polarity::HigherIsBetter, &NmsConfig::default());
        let labels: Vec<usize> = kept.iter().map(|b| b.label).collect();
        assert_eq!(labels, vec![0, 1]);
    }

    #[test]
    fn lower_is_better_keeps_smallest_score() {
        let boxes = vec![lb(0, 0, 0, 5.0), lb(0, 1, 1, 0.0)];
        let kept = suppress(boxes, Polarity::LowerIsBetter, &NmsConfig::default());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].bbox.confidence, 0.0);
    }

    #[test]
    fn invalid_thresholds_are_rejected() {
        let cfg = NmsConfig {
            iou_threshold: 1.5,
            ..NmsConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
