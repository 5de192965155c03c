//! Feature-matching pipeline.

use crate::features::{extract, DescriptorSet, SurfConfig};
use crate::geometry::{feature_confidence, verify, RansacConfig, Verification};
use crate::matching::{good_correspondences, DEFAULT_RATIO};
use crate::pipeline::{for_each_object, load_object, load_scene, template_name, CancelToken};
use crate::result::{FeatureOutcome, FeatureReport, QuadrilateralResult};
use crate::store::ImageStore;
use crate::trace::{trace_event, trace_span};
use crate::util::{SceneMatchError, SceneMatchResult};
use std::path::Path;

/// Configuration for [`find_features`].
#[derive(Clone, Debug)]
pub struct FeatureConfig {
    /// Minimum Hessian response for a keypoint.
    pub hessian_threshold: f64,
    /// Lowe ratio for accepting a nearest-neighbour match.
    pub ratio_threshold: f32,
    /// Detector and descriptor parameters.
    pub surf: SurfConfig,
    /// Homography estimation parameters.
    pub ransac: RansacConfig,
    /// Process objects (and descriptor matching) in parallel when `rayon` is enabled.
    pub parallel: bool,
}

impl FeatureConfig {
    /// Creates a configuration with the given Hessian threshold and defaults elsewhere.
    pub fn new(hessian_threshold: f64) -> Self {
        Self {
            hessian_threshold,
            ..Self::default()
        }
    }

    /// Validates configuration parameters.
    pub fn validate(&self) -> SceneMatchResult<()> {
        if !self.hessian_threshold.is_finite() {
            return Err(SceneMatchError::InvalidInput(
                "hessian_threshold must be finite",
            ));
        }
        if !(self.ratio_threshold > 0.0 && self.ratio_threshold <= 1.0) {
            return Err(SceneMatchError::InvalidInput(
                "ratio_threshold must be in (0, 1]",
            ));
        }
        self.surf.validate()?;
        self.ransac.validate()
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            hessian_threshold: 400.0,
            ratio_threshold: DEFAULT_RATIO,
            surf: SurfConfig::default(),
            ransac: RansacConfig::default(),
            parallel: false,
        }
    }
}

/// Locates each object image in the scene by feature matching.
///
/// The scene descriptors are computed once and shared read-only by every
/// object. Returns one [`FeatureOutcome`] per object path, in input order.
pub fn find_features<S, P>(
    store: &S,
    scene_path: &Path,
    object_paths: &[P],
    config: &FeatureConfig,
) -> SceneMatchResult<FeatureReport>
where
    S: ImageStore + ?Sized,
    P: AsRef<Path> + Sync,
{
    find_features_with_cancel(store, scene_path, object_paths, config, &CancelToken::new())
}

/// [`find_features`] with cooperative cancellation between objects.
pub fn find_features_with_cancel<S, P>(
    store: &S,
    scene_path: &Path,
    object_paths: &[P],
    config: &FeatureConfig,
    cancel: &CancelToken,
) -> SceneMatchResult<FeatureReport>
where
    S: ImageStore + ?Sized,
    P: AsRef<Path> + Sync,
{
    config.validate()?;
    let _span = trace_span!("find_features", objects = object_paths.len()).entered();

    let scene = load_scene(store, scene_path)?;
    let scene_set = extract(scene.view(), config.hessian_threshold, &config.surf)?;
    trace_event!("scene_keypoints", count = scene_set.len());

    let matches = for_each_object(object_paths, config.parallel, cancel, |path| {
        match_object(store, path, &scene_set, config)
    })?;
    Ok(FeatureReport { matches })
}

fn match_object<S: ImageStore + ?Sized>(
    store: &S,
    path: &Path,
    scene: &DescriptorSet,
    config: &FeatureConfig,
) -> FeatureOutcome {
    match try_match_object(store, path, scene, config) {
        Ok(outcome) => outcome,
        Err(err) => FeatureOutcome::Error {
            message: err.to_string(),
        },
    }
}

fn try_match_object<S: ImageStore + ?Sized>(
    store: &S,
    path: &Path,
    scene: &DescriptorSet,
    config: &FeatureConfig,
) -> SceneMatchResult<FeatureOutcome> {
    let object = load_object(store, path)?;
    let object_set = extract(object.view(), config.hessian_threshold, &config.surf)?;
    if object_set.is_empty() || scene.is_empty() {
        return Ok(FeatureOutcome::NoDetection { matches_count: 0 });
    }

    let good = good_correspondences(&object_set, scene, config.ratio_threshold, config.parallel)?;
    let outcome = match verify(&good, object.width(), object.height(), &config.ransac)? {
        Verification::InsufficientMatches { count } => {
            FeatureOutcome::NoDetection { matches_count: count }
        }
        Verification::Located {
            corners,
            homography,
            inliers,
        } => FeatureOutcome::Located(QuadrilateralResult {
            template: template_name(path),
            corners,
            confidence: feature_confidence(good.len(), object_set.len(), scene.len()),
            matches_count: good.len(),
            inliers,
            homography,
        }),
    };
    trace_event!("object_done", good = good.len(), keypoints = object_set.len());
    Ok(outcome)
}
