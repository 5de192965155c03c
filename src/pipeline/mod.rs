//! Batch entry points: one scene against many object images.
//!
//! Both pipelines load the scene once, process each object independently,
//! and return one outcome per object in input order. A failure while handling
//! one object is recorded in its slot and never affects its siblings; only a
//! scene load failure, invalid configuration or cancellation fails the call.

mod features;
mod templates;

pub use features::{find_features, find_features_with_cancel, FeatureConfig};
pub use templates::{find_templates, find_templates_with_cancel, TemplateConfig};

use crate::image::OwnedImage;
use crate::store::ImageStore;
use crate::util::{SceneMatchError, SceneMatchResult};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between a caller and a running batch.
///
/// Checked before each object is processed; objects already in flight finish.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    fn check(&self) -> SceneMatchResult<()> {
        if self.is_cancelled() {
            Err(SceneMatchError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Display name of an object image: its file name, or the whole path.
pub(crate) fn template_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub(crate) fn load_scene<S: ImageStore + ?Sized>(
    store: &S,
    path: &Path,
) -> SceneMatchResult<OwnedImage> {
    store
        .load_gray(path)
        .map_err(|err| SceneMatchError::SceneLoad {
            path: path.display().to_string(),
            reason: err.to_string(),
        })
}

pub(crate) fn load_object<S: ImageStore + ?Sized>(
    store: &S,
    path: &Path,
) -> SceneMatchResult<OwnedImage> {
    store
        .load_gray(path)
        .map_err(|err| SceneMatchError::ObjectLoad {
            path: path.display().to_string(),
            reason: err.to_string(),
        })
}

/// Applies `f` to every object path, preserving input order.
///
/// With the `rayon` feature and `parallel` set, objects run concurrently.
pub(crate) fn for_each_object<P, T, F>(
    paths: &[P],
    parallel: bool,
    cancel: &CancelToken,
    f: F,
) -> SceneMatchResult<Vec<T>>
where
    P: AsRef<Path> + Sync,
    T: Send,
    F: Fn(&Path) -> T + Sync,
{
    let run = |path: &P| -> SceneMatchResult<T> {
        cancel.check()?;
        Ok(f(path.as_ref()))
    };

    #[cfg(feature = "rayon")]
    if parallel {
        use rayon::prelude::*;
        return paths.par_iter().map(run).collect();
    }
    #[cfg(not(feature = "rayon"))]
    let _ = parallel;

    paths.iter().map(run).collect()
}
