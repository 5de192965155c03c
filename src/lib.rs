//! SceneMatch locates object images inside a scene image.
//!
//! Two independent strategies are provided:
//!
//! - **Feature matching** ([`find_features`]): SURF-style keypoints and
//!   descriptors, Lowe ratio-tested nearest-neighbour matching and a RANSAC
//!   homography that projects the object's corners into the scene. Tolerates
//!   scale, rotation and perspective changes.
//! - **Template scanning** ([`find_templates`]): every placement of the object
//!   is scored with one of six squared-difference or correlation metrics and
//!   the placements passing a threshold are reported as boxes.
//!
//! Both pipelines read images through an [`ImageStore`], load the scene once,
//! and return one outcome per object in input order. Optional features:
//! `rayon` (parallel objects, rows and descriptor matching), `image-io`
//! (filesystem store), `tracing` (spans and events) and `serde` (report
//! serialization).

pub mod candidate;
pub mod features;
pub mod geometry;
pub mod image;
pub mod kernel;
pub mod matching;
pub mod pipeline;
pub mod result;
pub mod search;
pub mod store;
pub mod template;
mod trace;
pub mod util;

pub use candidate::nms::{suppress, LabelledBox, NmsConfig};
pub use features::{extract, DescriptorSet, Keypoint, SurfConfig};
pub use geometry::{feature_confidence, verify, RansacConfig, Verification, MIN_CORRESPONDENCES};
pub use image::{ImageView, IntegralImage, OwnedImage};
pub use matching::{good_correspondences, knn2, ratio_test, Correspondence, KnnMatch};
pub use pipeline::{
    find_features, find_features_with_cancel, find_templates, find_templates_with_cancel,
    CancelToken, FeatureConfig, TemplateConfig,
};
pub use result::{
    FeatureOutcome, FeatureReport, QuadrilateralResult, TemplateMatchResult, TemplateOutcome,
    TemplateReport,
};
pub use search::{scan_template, Metric, Polarity, TemplateBox, TemplateScan};
#[cfg(feature = "image-io")]
pub use store::FsImageStore;
pub use store::{ImageStore, MemoryImageStore};
pub use template::TemplatePlan;
pub use util::{SceneMatchError, SceneMatchResult};
