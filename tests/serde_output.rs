#![cfg(feature = "serde")]

use nalgebra::Matrix3;
use scenematch::{
    FeatureOutcome, FeatureReport, QuadrilateralResult, TemplateBox, TemplateMatchResult,
    TemplateOutcome, TemplateReport,
};
use serde_json::json;

#[test]
fn feature_report_shape() {
    let report = FeatureReport {
        matches: vec![
            FeatureOutcome::Error {
                message: "Failed to load object image".to_string(),
            },
            FeatureOutcome::NoDetection { matches_count: 3 },
            FeatureOutcome::Located(QuadrilateralResult {
                template: "obj.png".to_string(),
                corners: [[1.0, 2.0], [11.0, 2.0], [11.0, 12.0], [1.0, 12.0]],
                confidence: 0.5,
                matches_count: 20,
                inliers: 18,
                homography: Matrix3::identity(),
            }),
        ],
    };
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(
        value,
        json!({
            "matches": [
                {"error": "Failed to load object image"},
                {"matchesCount": 3},
                {
                    "template": "obj.png",
                    "corners": [
                        {"x": 1.0, "y": 2.0},
                        {"x": 11.0, "y": 2.0},
                        {"x": 11.0, "y": 12.0},
                        {"x": 1.0, "y": 12.0}
                    ],
                    "confidence": 0.5,
                    "matchesCount": 20
                }
            ]
        })
    );
}

#[test]
fn template_report_shape() {
    let bbox = TemplateBox {
        x: 3,
        y: 4,
        width: 10,
        height: 8,
        confidence: 0.0,
    };
    let report = TemplateReport {
        results: vec![
            TemplateOutcome::Error {
                template: "big.png".to_string(),
                message: "Scene image is smaller than template image".to_string(),
            },
            TemplateOutcome::Scanned(TemplateMatchResult {
                template: "ok.png".to_string(),
                max_confidence: 12.5,
                best: bbox,
                matches: vec![bbox],
            }),
        ],
    };
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(
        value,
        json!({
            "results": [
                {"template": "big.png", "error": "Scene image is smaller than template image"},
                {
                    "template": "ok.png",
                    "maxConfidence": 12.5,
                    "matches": [{"x": 3, "y": 4, "width": 10, "height": 8, "confidence": 0.0}]
                }
            ]
        })
    );
}
