//! Scale- and rotation-invariant keypoints with SURF-style descriptors.
//!
//! Detection evaluates box-filter approximations of the scale-normalized
//! Hessian on an integral image, keeps strict 3x3x3 maxima above the caller's
//! threshold, and refines them with a quadratic fit. Each keypoint then gets a
//! dominant orientation from Haar wavelet responses and a 64-value (or
//! 128-value, `extended`) descriptor sampled in the rotated frame.
//!
//! Extraction is a pure function of the input view and configuration: the
//! output is deterministic and nothing is cached between calls.

mod descriptor;
mod hessian;
mod orientation;

use crate::image::{ImageView, IntegralImage};
use crate::trace::{trace_event, trace_span};
use crate::util::{SceneMatchError, SceneMatchResult};
use std::cmp::Ordering;

/// Length of a standard descriptor.
pub const DESCRIPTOR_LEN: usize = 64;
/// Length of an extended descriptor.
pub const EXTENDED_DESCRIPTOR_LEN: usize = 128;

/// Detected interest point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
    /// Sub-pixel column of the keypoint center.
    pub x: f32,
    /// Sub-pixel row of the keypoint center.
    pub y: f32,
    /// Filter size in pixels the keypoint was detected at.
    pub size: f32,
    /// Dominant orientation in degrees, measured in image coordinates (y down).
    pub angle: f32,
    /// Hessian determinant response.
    pub response: f32,
    /// Octave index the keypoint was detected in.
    pub octave: usize,
}

impl Keypoint {
    /// Returns the keypoint location as `[x, y]` in `f64`.
    pub fn point(&self) -> [f64; 2] {
        [f64::from(self.x), f64::from(self.y)]
    }
}

/// Keypoints with their descriptors, stored 1:1 in detection order.
#[derive(Clone, Debug, Default)]
pub struct DescriptorSet {
    keypoints: Vec<Keypoint>,
    descriptors: Vec<f32>,
    dim: usize,
}

impl DescriptorSet {
    /// Creates an empty set for descriptors of length `dim`.
    pub fn new(dim: usize) -> Self {
        Self {
            keypoints: Vec::new(),
            descriptors: Vec::new(),
            dim,
        }
    }

    /// Appends a keypoint and its descriptor.
    pub fn push(&mut self, keypoint: Keypoint, descriptor: &[f32]) -> SceneMatchResult<()> {
        if descriptor.len() != self.dim {
            return Err(SceneMatchError::InvalidInput(
                "descriptor length does not match the set dimension",
            ));
        }
        self.keypoints.push(keypoint);
        self.descriptors.extend_from_slice(descriptor);
        Ok(())
    }

    /// Returns the number of keypoints.
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    /// Returns `true` when no keypoints were detected.
    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// Returns the descriptor length.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Returns all keypoints.
    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    /// Returns the descriptor of keypoint `index`.
    pub fn descriptor(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.dim)?;
        self.descriptors.get(start..start + self.dim)
    }

    /// Iterates over descriptors in keypoint order.
    pub fn descriptors(&self) -> impl ExactSizeIterator<Item = &[f32]> + '_ {
        self.descriptors.chunks_exact(self.dim.max(1))
    }
}

/// Detector and descriptor parameters.
#[derive(Clone, Debug)]
pub struct SurfConfig {
    /// Number of octaves; each doubles the filter sizes and sample step.
    pub octaves: usize,
    /// Number of detection layers per octave.
    pub octave_layers: usize,
    /// Use 128-value descriptors split by response sign.
    pub extended: bool,
    /// Skip orientation assignment (all keypoints at 0 degrees).
    pub upright: bool,
}

impl Default for SurfConfig {
    fn default() -> Self {
        Self {
            octaves: 4,
            octave_layers: 3,
            extended: false,
            upright: false,
        }
    }
}

impl SurfConfig {
    /// Validates configuration parameters.
    pub fn validate(&self) -> SceneMatchResult<()> {
        if self.octaves == 0 || self.octaves > 8 {
            return Err(SceneMatchError::InvalidInput("octaves must be in 1..=8"));
        }
        if self.octave_layers == 0 {
            return Err(SceneMatchError::InvalidInput(
                "octave_layers must be at least 1",
            ));
        }
        Ok(())
    }

    /// Descriptor length produced by this configuration.
    pub fn descriptor_len(&self) -> usize {
        if self.extended {
            EXTENDED_DESCRIPTOR_LEN
        } else {
            DESCRIPTOR_LEN
        }
    }
}

/// Detects keypoints and computes their descriptors.
///
/// `hessian_threshold` is compared against the determinant response computed
/// from area-normalized box filters over raw 0..255 intensities. A blank image
/// yields an empty set, which is not an error.
pub fn extract(
    image: ImageView<'_, u8>,
    hessian_threshold: f64,
    cfg: &SurfConfig,
) -> SceneMatchResult<DescriptorSet> {
    cfg.validate()?;
    if !hessian_threshold.is_finite() {
        return Err(SceneMatchError::InvalidInput(
            "hessian threshold must be finite",
        ));
    }

    let _span = trace_span!("extract", width = image.width(), height = image.height()).entered();

    let integral = IntegralImage::new(image);
    let mut keypoints = hessian::detect(&integral, hessian_threshold as f32, cfg);
    keypoints.sort_by(keypoint_cmp);

    let dim = cfg.descriptor_len();
    let mut set = DescriptorSet::new(dim);
    let mut desc = vec![0.0f32; dim];
    let min_side = image.width().min(image.height()) as f32;
    for mut kp in keypoints {
        let scale = kp.size * 1.2 / 9.0;
        if 4.0 * scale > min_side {
            continue;
        }
        let theta = if cfg.upright {
            0.0
        } else {
            orientation::dominant_orientation(&integral, kp.x, kp.y, scale)
        };
        kp.angle = theta.to_degrees();
        descriptor::compute(image, &integral, &kp, scale, theta, cfg.extended, &mut desc);
        set.push(kp, &desc)?;
    }

    trace_event!("keypoints", count = set.len());
    Ok(set)
}

/// Orders keypoints by descending response with a stable positional tie-break.
fn keypoint_cmp(a: &Keypoint, b: &Keypoint) -> Ordering {
    b.response
        .total_cmp(&a.response)
        .then_with(|| a.y.total_cmp(&b.y))
        .then_with(|| a.x.total_cmp(&b.x))
        .then_with(|| a.size.total_cmp(&b.size))
}

#[cfg(test)]
mod tests {
    use super::{extract, DescriptorSet, Keypoint, SurfConfig, DESCRIPTOR_LEN};
    use crate::ImageView;

    fn blob_image(width: usize, height: usize, blobs: &[(usize, usize, usize, u8)]) -> Vec<u8> {
        let mut data = vec![20u8; width * height];
        for &(cx, cy, half, value) in blobs {
            for y in cy - half..=cy + half {
                for x in cx - half..=cx + half {
                    data[y * width + x] = value;
                }
            }
        }
        data
    }

    #[test]
    fn blank_image_has_no_keypoints() {
        let data = vec![128u8; 64 * 64];
        let view = ImageView::from_slice(&data, 64, 64).unwrap();
        let set = extract(view, 10.0, &SurfConfig::default()).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.dim(), DESCRIPTOR_LEN);
    }

    #[test]
    fn bright_blob_is_detected_near_its_center() {
        let data = blob_image(96, 96, &[(48, 48, 3, 230)]);
        let view = ImageView::from_slice(&data, 96, 96).unwrap();
        let set = extract(view, 50.0, &SurfConfig::default()).unwrap();
        assert!(!set.is_empty());
        let best = set.keypoints()[0];
        assert!((best.x - 48.0).abs() < 3.0, "x = {}", best.x);
        assert!((best.y - 48.0).abs() < 3.0, "y = {}", best.y);
    }

    #[test]
    fn descriptors_are_unit_length_and_deterministic() {
        let data = blob_image(
            128,
            96,
            &[(30, 30, 4, 200), (80, 40, 6, 90), (60, 70, 3, 250), (100, 70, 5, 160)],
        );
        let view = ImageView::from_slice(&data, 128, 96).unwrap();
        let a = extract(view, 20.0, &SurfConfig::default()).unwrap();
        let b = extract(view, 20.0, &SurfConfig::default()).unwrap();
        assert!(!a.is_empty());
        assert_eq!(a.keypoints(), b.keypoints());
        for (da, db) in a.descriptors().zip(b.descriptors()) {
            assert_eq!(da, db);
            let norm: f32 = da.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-3, "norm = {norm}");
        }
    }

    #[test]
    fn higher_threshold_keeps_fewer_keypoints() {
        let data = blob_image(128, 96, &[(30, 30, 4, 200), (80, 40, 6, 60), (60, 70, 3, 250)]);
        let view = ImageView::from_slice(&data, 128, 96).unwrap();
        let low = extract(view, 10.0, &SurfConfig::default()).unwrap();
        let high = extract(view, 5000.0, &SurfConfig::default()).unwrap();
        assert!(high.len() <= low.len());
    }

    #[test]
    fn extended_config_doubles_descriptor_length() {
        let data = blob_image(96, 96, &[(48, 48, 4, 220)]);
        let view = ImageView::from_slice(&data, 96, 96).unwrap();
        let cfg = SurfConfig {
            extended: true,
            ..SurfConfig::default()
        };
        let set = extract(view, 20.0, &cfg).unwrap();
        assert_eq!(set.dim(), 128);
        assert_eq!(set.descriptors().len(), set.len());
    }

    #[test]
    fn descriptor_set_rejects_wrong_length() {
        let mut set = DescriptorSet::new(4);
        let kp = Keypoint {
            x: 1.0,
            y: 2.0,
            size: 9.0,
            angle: 0.0,
            response: 1.0,
            octave: 0,
        };
        assert!(set.push(kp, &[0.0; 3]).is_err());
        set.push(kp, &[0.5; 4]).unwrap();
        assert_eq!(set.descriptor(0).unwrap(), &[0.5; 4]);
        assert!(set.descriptor(1).is_none());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let data = vec![0u8; 16];
        let view = ImageView::from_slice(&data, 4, 4).unwrap();
        let cfg = SurfConfig {
            octaves: 0,
            ..SurfConfig::default()
        };
        assert!(extract(view, 10.0, &cfg).is_err());
        assert!(extract(view, f64::NAN, &SurfConfig::default()).is_err());
    }
}
