//! Template-scanning pipeline.

use crate::image::OwnedImage;
use crate::pipeline::{for_each_object, load_object, load_scene, template_name, CancelToken};
use crate::result::{TemplateMatchResult, TemplateOutcome, TemplateReport};
use crate::search::{scan_template, Metric};
use crate::store::ImageStore;
use crate::trace::trace_span;
use crate::util::{SceneMatchError, SceneMatchResult};
use std::path::Path;

/// Configuration for [`find_templates`].
#[derive(Clone, Debug)]
pub struct TemplateConfig {
    /// Similarity metric.
    pub metric: Metric,
    /// Pass threshold, interpreted with the metric's polarity.
    pub threshold: f64,
    /// Score rows and objects in parallel when `rayon` is enabled.
    pub parallel: bool,
}

impl TemplateConfig {
    /// Creates a configuration from an integer metric code and threshold.
    pub fn from_code(code: i32, threshold: f64) -> SceneMatchResult<Self> {
        Ok(Self {
            metric: Metric::from_code(code)?,
            threshold,
            parallel: false,
        })
    }

    /// Validates configuration parameters.
    pub fn validate(&self) -> SceneMatchResult<()> {
        if !self.threshold.is_finite() {
            return Err(SceneMatchError::InvalidInput("threshold must be finite"));
        }
        Ok(())
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            metric: Metric::CCoeffNormed,
            threshold: 0.8,
            parallel: false,
        }
    }
}

/// Scans each object image over the scene.
///
/// Returns one [`TemplateOutcome`] per object path, in input order.
pub fn find_templates<S, P>(
    store: &S,
    scene_path: &Path,
    object_paths: &[P],
    config: &TemplateConfig,
) -> SceneMatchResult<TemplateReport>
where
    S: ImageStore + ?Sized,
    P: AsRef<Path> + Sync,
{
    find_templates_with_cancel(store, scene_path, object_paths, config, &CancelToken::new())
}

/// [`find_templates`] with cooperative cancellation between objects.
pub fn find_templates_with_cancel<S, P>(
    store: &S,
    scene_path: &Path,
    object_paths: &[P],
    config: &TemplateConfig,
    cancel: &CancelToken,
) -> SceneMatchResult<TemplateReport>
where
    S: ImageStore + ?Sized,
    P: AsRef<Path> + Sync,
{
    config.validate()?;
    let _span = trace_span!(
        "find_templates",
        objects = object_paths.len(),
        metric = config.metric.code()
    )
    .entered();

    let scene = load_scene(store, scene_path)?;
    let results = for_each_object(object_paths, config.parallel, cancel, |path| {
        scan_object(store, path, &scene, config)
    })?;
    Ok(TemplateReport { results })
}

fn scan_object<S: ImageStore + ?Sized>(
    store: &S,
    path: &Path,
    scene: &OwnedImage,
    config: &TemplateConfig,
) -> TemplateOutcome {
    let template = template_name(path);
    let scanned = load_object(store, path).and_then(|object| {
        scan_template(
            scene.view(),
            object.view(),
            config.metric,
            config.threshold,
            config.parallel,
        )
    });
    match scanned {
        Ok(scan) => TemplateOutcome::Scanned(TemplateMatchResult {
            template,
            max_confidence: scan.max_confidence,
            best: scan.best,
            matches: scan.matches,
        }),
        Err(err) => TemplateOutcome::Error {
            template,
            message: err.to_string(),
        },
    }
}
