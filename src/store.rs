//! Image stores: where pipelines get their grayscale pixel grids from.
//!
//! Decoding is outside the matching core; pipelines only need "load a
//! grayscale grid from a path, or fail". `FsImageStore` decodes files with the
//! `image` crate, `MemoryImageStore` serves images already held in memory.

use crate::image::OwnedImage;
use crate::util::{SceneMatchError, SceneMatchResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Source of grayscale images keyed by path.
pub trait ImageStore: Sync {
    /// Loads the image at `path` as an 8-bit grayscale grid.
    fn load_gray(&self, path: &Path) -> SceneMatchResult<OwnedImage>;
}

/// Filesystem store backed by the `image` crate.
#[cfg(feature = "image-io")]
#[derive(Clone, Copy, Debug, Default)]
pub struct FsImageStore;

#[cfg(feature = "image-io")]
impl ImageStore for FsImageStore {
    fn load_gray(&self, path: &Path) -> SceneMatchResult<OwnedImage> {
        crate::image::io::load_gray_image(path)
    }
}

/// In-memory store mapping paths to decoded images.
#[derive(Clone, Debug, Default)]
pub struct MemoryImageStore {
    images: HashMap<PathBuf, OwnedImage>,
}

impl MemoryImageStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `image` under `path`, replacing any previous entry.
    pub fn insert<P: Into<PathBuf>>(&mut self, path: P, image: OwnedImage) {
        self.images.insert(path.into(), image);
    }

    /// Builder-style variant of [`MemoryImageStore::insert`].
    pub fn with<P: Into<PathBuf>>(mut self, path: P, image: OwnedImage) -> Self {
        self.insert(path, image);
        self
    }

    /// Returns the number of stored images.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Returns `true` when no images are stored.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl ImageStore for MemoryImageStore {
    fn load_gray(&self, path: &Path) -> SceneMatchResult<OwnedImage> {
        self.images
            .get(path)
            .cloned()
            .ok_or_else(|| SceneMatchError::ImageIo {
                reason: format!("no image registered for {}", path.display()),
            })
    }
}
