//! Error types for scenematch.

use thiserror::Error;

/// Result alias for scenematch operations.
pub type SceneMatchResult<T> = std::result::Result<T, SceneMatchError>;

/// Errors that can occur when loading images or running the matchers.
///
/// Call-level variants (`InvalidInput`, `UnknownMetric`, `SceneLoad`,
/// `Cancelled`) abort a whole batch. The remaining variants are captured per
/// object and reported inline through their `Display` text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneMatchError {
    /// Image dimensions are zero or overflow.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// The stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// The backing buffer cannot hold the described image.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A region of interest does not fit inside the image.
    #[error("roi {x},{y} {width}x{height} out of bounds for {img_width}x{img_height}")]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// The template matching method code is not one of the supported metrics.
    #[error("unknown template matching method {0}")]
    UnknownMetric(i32),
    /// Image decoding failed.
    #[error("image io error: {reason}")]
    ImageIo { reason: String },
    /// The scene image could not be loaded; fatal for the whole call.
    #[error("Failed to load scene image")]
    SceneLoad { path: String, reason: String },
    /// An object image could not be loaded; local to that object.
    #[error("Failed to load object image")]
    ObjectLoad { path: String, reason: String },
    /// The object image does not fit inside the scene.
    #[error("Scene image is smaller than template image")]
    TemplateLargerThanScene {
        scene_width: usize,
        scene_height: usize,
        template_width: usize,
        template_height: usize,
    },
    /// Robust homography estimation could not produce a valid model.
    #[error("homography estimation failed: {reason}")]
    DegenerateHomography { reason: &'static str },
    /// A corner projected through the homography to infinity or NaN.
    #[error("homography projection is not finite")]
    NonFiniteProjection,
    /// The call was cancelled between object iterations.
    #[error("cancelled")]
    Cancelled,
}
