//! Result model returned by the pipelines.
//!
//! With the `serde` feature, reports serialize to the dictionary shapes
//! consumed by callers: `{"matches": [...]}` for feature matching and
//! `{"results": [...]}` for template scanning, with camelCase keys.

use crate::candidate::nms::{suppress, LabelledBox, NmsConfig};
use crate::search::{Polarity, TemplateBox};
use nalgebra::Matrix3;

/// Object located in the scene by feature matching.
#[derive(Clone, Debug, PartialEq)]
pub struct QuadrilateralResult {
    /// File name of the object image.
    pub template: String,
    /// Scene corners for object `(0,0)`, `(W,0)`, `(W,H)`, `(0,H)`.
    pub corners: [[f64; 2]; 4],
    /// `min(1, 2 * good / (object_keypoints + scene_keypoints))`.
    pub confidence: f64,
    /// Number of ratio-tested matches.
    pub matches_count: usize,
    /// Number of RANSAC inliers among those matches.
    pub inliers: usize,
    /// Object-to-scene homography.
    pub homography: Matrix3<f64>,
}

/// Per-object outcome of feature matching.
#[derive(Clone, Debug, PartialEq)]
pub enum FeatureOutcome {
    /// The object could not be processed.
    Error {
        /// Human-readable reason.
        message: String,
    },
    /// Too few keypoints or good matches to attempt a homography.
    NoDetection {
        /// Number of good matches found (0 when either image had no keypoints).
        matches_count: usize,
    },
    /// The object was located.
    Located(QuadrilateralResult),
}

impl FeatureOutcome {
    /// Returns the located result, if any.
    pub fn located(&self) -> Option<&QuadrilateralResult> {
        match self {
            FeatureOutcome::Located(q) => Some(q),
            _ => None,
        }
    }

    /// Returns the good-match count when one was computed.
    pub fn matches_count(&self) -> Option<usize> {
        match self {
            FeatureOutcome::Error { .. } => None,
            FeatureOutcome::NoDetection { matches_count } => Some(*matches_count),
            FeatureOutcome::Located(q) => Some(q.matches_count),
        }
    }
}

/// Feature matching results, one entry per object in input order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureReport {
    /// Per-object outcomes.
    pub matches: Vec<FeatureOutcome>,
}

/// Scan result for one object.
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateMatchResult {
    /// File name of the object image.
    pub template: String,
    /// Largest score anywhere in the score map.
    pub max_confidence: f64,
    /// Best placement under the metric's polarity.
    pub best: TemplateBox,
    /// Placements passing the threshold, row-major.
    pub matches: Vec<TemplateBox>,
}

/// Per-object outcome of template scanning.
#[derive(Clone, Debug, PartialEq)]
pub enum TemplateOutcome {
    /// The object could not be scanned.
    Error {
        /// File name of the object image.
        template: String,
        /// Human-readable reason.
        message: String,
    },
    /// The object was scanned over the whole scene.
    Scanned(TemplateMatchResult),
}

impl TemplateOutcome {
    /// File name of the object image.
    pub fn template(&self) -> &str {
        match self {
            TemplateOutcome::Error { template, .. } => template,
            TemplateOutcome::Scanned(r) => &r.template,
        }
    }

    /// Returns the scan result, if any.
    pub fn scanned(&self) -> Option<&TemplateMatchResult> {
        match self {
            TemplateOutcome::Scanned(r) => Some(r),
            TemplateOutcome::Error { .. } => None,
        }
    }
}

/// Template scanning results, one entry per object in input order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TemplateReport {
    /// Per-object outcomes.
    pub results: Vec<TemplateOutcome>,
}

impl TemplateReport {
    /// All passing boxes, labelled with the index of their object.
    pub fn labelled_boxes(&self) -> Vec<LabelledBox> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(label, outcome)| outcome.scanned().map(|r| (label, r)))
            .flat_map(|(label, r)| r.matches.iter().map(move |&bbox| LabelledBox { label, bbox }))
            .collect()
    }

    /// Merges boxes across objects with IoU suppression.
    pub fn suppressed(&self, polarity: Polarity, config: &NmsConfig) -> Vec<LabelledBox> {
        suppress(self.labelled_boxes(), polarity, config)
    }
}

#[cfg(feature = "serde")]
mod ser {
    use super::*;
    use serde::ser::{SerializeMap, SerializeStruct};
    use serde::{Serialize, Serializer};

    struct Point([f64; 2]);

    impl Serialize for Point {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut s = serializer.serialize_struct("Point", 2)?;
            s.serialize_field("x", &self.0[0])?;
            s.serialize_field("y", &self.0[1])?;
            s.end()
        }
    }

    impl Serialize for FeatureOutcome {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                FeatureOutcome::Error { message } => {
                    let mut m = serializer.serialize_map(Some(1))?;
                    m.serialize_entry("error", message)?;
                    m.end()
                }
                FeatureOutcome::NoDetection { matches_count } => {
                    let mut m = serializer.serialize_map(Some(1))?;
                    m.serialize_entry("matchesCount", matches_count)?;
                    m.end()
                }
                FeatureOutcome::Located(q) => {
                    let corners: Vec<Point> = q.corners.iter().map(|&c| Point(c)).collect();
                    let mut m = serializer.serialize_map(Some(4))?;
                    m.serialize_entry("template", &q.template)?;
                    m.serialize_entry("corners", &corners)?;
                    m.serialize_entry("confidence", &q.confidence)?;
                    m.serialize_entry("matchesCount", &q.matches_count)?;
                    m.end()
                }
            }
        }
    }

    impl Serialize for FeatureReport {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut s = serializer.serialize_struct("FeatureReport", 1)?;
            s.serialize_field("matches", &self.matches)?;
            s.end()
        }
    }

    impl Serialize for TemplateBox {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut s = serializer.serialize_struct("TemplateBox", 5)?;
            s.serialize_field("x", &self.x)?;
            s.serialize_field("y", &self.y)?;
            s.serialize_field("width", &self.width)?;
            s.serialize_field("height", &self.height)?;
            s.serialize_field("confidence", &self.confidence)?;
            s.end()
        }
    }

    impl Serialize for TemplateOutcome {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                TemplateOutcome::Error { template, message } => {
                    let mut m = serializer.serialize_map(Some(2))?;
                    m.serialize_entry("template", template)?;
                    m.serialize_entry("error", message)?;
                    m.end()
                }
                TemplateOutcome::Scanned(r) => {
                    let mut m = serializer.serialize_map(Some(3))?;
                    m.serialize_entry("template", &r.template)?;
                    m.serialize_entry("maxConfidence", &r.max_confidence)?;
                    m.serialize_entry("matches", &r.matches)?;
                    m.end()
                }
            }
        }
    }

    impl Serialize for TemplateReport {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut s = serializer.serialize_struct("TemplateReport", 1)?;
            s.serialize_field("results", &self.results)?;
            s.end()
        }
    }

    impl Serialize for LabelledBox {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut s = serializer.serialize_struct("LabelledBox", 6)?;
            s.serialize_field("label", &self.label)?;
            s.serialize_field("x", &self.bbox.x)?;
            s.serialize_field("y", &self.bbox.y)?;
            s.serialize_field("width", &self.bbox.width)?;
            s.serialize_field("height", &self.bbox.height)?;
            s.serialize_field("confidence", &self.bbox.confidence)?;
            s.end()
        }
    }
}
