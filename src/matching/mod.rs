//! Nearest-neighbor descriptor matching with Lowe's ratio test.
//!
//! Matching is exhaustive: every query descriptor is compared with every
//! reference descriptor under the Euclidean distance. The two nearest
//! references are kept (ties resolve to the lower index), so the parallel path
//! returns exactly what the sequential one does.

use crate::features::DescriptorSet;
use crate::trace::trace_event;
use crate::util::{SceneMatchError, SceneMatchResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Default ratio for Lowe's test.
pub const DEFAULT_RATIO: f32 = 0.75;

/// The two nearest reference descriptors for one query descriptor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KnnMatch {
    /// Index into the query set.
    pub query_idx: usize,
    /// Index of the nearest reference descriptor.
    pub best_idx: usize,
    /// Distance to the nearest reference descriptor.
    pub best_distance: f32,
    /// Distance to the second nearest reference descriptor.
    pub second_distance: f32,
}

impl KnnMatch {
    /// Returns `true` when the match passes the ratio test.
    pub fn passes_ratio(&self, ratio: f32) -> bool {
        self.best_distance < ratio * self.second_distance
    }
}

/// A pair of locations believed to show the same physical point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Correspondence {
    /// Location in object image coordinates.
    pub object: [f64; 2],
    /// Location in scene image coordinates.
    pub scene: [f64; 2],
}

#[inline]
fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

fn nearest_two(query_idx: usize, query: &[f32], reference: &DescriptorSet) -> Option<KnnMatch> {
    let mut best = (usize::MAX, f32::INFINITY);
    let mut second = f32::INFINITY;
    for (idx, candidate) in reference.descriptors().enumerate() {
        let d = squared_distance(query, candidate);
        if d < best.1 {
            second = best.1;
            best = (idx, d);
        } else if d < second {
            second = d;
        }
    }
    if best.0 == usize::MAX || !second.is_finite() {
        return None;
    }
    Some(KnnMatch {
        query_idx,
        best_idx: best.0,
        best_distance: best.1.sqrt(),
        second_distance: second.sqrt(),
    })
}

/// Finds the two nearest reference descriptors for every query descriptor.
///
/// Returns an empty list when the reference set has fewer than two entries,
/// since no query can then be ratio tested.
pub fn knn2(
    query: &DescriptorSet,
    reference: &DescriptorSet,
    parallel: bool,
) -> SceneMatchResult<Vec<KnnMatch>> {
    if query.is_empty() || reference.len() < 2 {
        return Ok(Vec::new());
    }
    if query.dim() != reference.dim() {
        return Err(SceneMatchError::InvalidInput(
            "descriptor dimensions differ between query and reference",
        ));
    }

    #[cfg(feature = "rayon")]
    if parallel {
        let descriptors: Vec<&[f32]> = query.descriptors().collect();
        return Ok(descriptors
            .par_iter()
            .enumerate()
            .filter_map(|(idx, desc)| nearest_two(idx, desc, reference))
            .collect());
    }
    #[cfg(not(feature = "rayon"))]
    let _ = parallel;

    Ok(query
        .descriptors()
        .enumerate()
        .filter_map(|(idx, desc)| nearest_two(idx, desc, reference))
        .collect())
}

/// Keeps matches whose best distance is below `ratio` times the second best.
pub fn ratio_test(matches: &[KnnMatch], ratio: f32) -> Vec<KnnMatch> {
    matches
        .iter()
        .copied()
        .filter(|m| m.passes_ratio(ratio))
        .collect()
}

/// Matches object descriptors against scene descriptors and returns the
/// ratio-tested correspondences in object keypoint order.
pub fn good_correspondences(
    object: &DescriptorSet,
    scene: &DescriptorSet,
    ratio: f32,
    parallel: bool,
) -> SceneMatchResult<Vec<Correspondence>> {
    let knn = knn2(object, scene, parallel)?;
    let good = ratio_test(&knn, ratio);
    trace_event!("good_matches", candidates = knn.len(), good = good.len());

    let object_kps = object.keypoints();
    let scene_kps = scene.keypoints();
    Ok(good
        .iter()
        .map(|m| Correspondence {
            object: object_kps[m.query_idx].point(),
            scene: scene_kps[m.best_idx].point(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{good_correspondences, knn2, ratio_test, KnnMatch};
    use crate::features::{DescriptorSet, Keypoint};

    fn kp(x: f32, y: f32) -> Keypoint {
        Keypoint {
            x,
            y,
            size: 9.0,
            angle: 0.0,
            response: 1.0,
            octave: 0,
        }
    }

    fn set(points: &[([f32; 2], f32)]) -> DescriptorSet {
        let mut out = DescriptorSet::new(2);
        for &([x, y], dx) in points {
            out.push(kp(x, y), &[dx, 0.0]).unwrap();
        }
        out
    }

    #[test]
    fn knn_finds_two_nearest() {
        let query = set(&[([0.0, 0.0], 1.0)]);
        let reference = set(&[([5.0, 5.0], 4.0), ([6.0, 6.0], 1.1), ([7.0, 7.0], 2.0)]);
        let knn = knn2(&query, &reference, false).unwrap();
        assert_eq!(knn.len(), 1);
        assert_eq!(knn[0].best_idx, 1);
        assert!((knn[0].best_distance - 0.1).abs() < 1e-5);
        assert!((knn[0].second_distance - 1.0).abs() < 1e-5);
    }

    #[test]
    fn reference_with_one_entry_yields_no_matches() {
        let query = set(&[([0.0, 0.0], 1.0)]);
        let reference = set(&[([5.0, 5.0], 1.0)]);
        assert!(knn2(&query, &reference, false).unwrap().is_empty());
    }

    #[test]
    fn ties_resolve_to_lowest_index_and_fail_ratio() {
        let query = set(&[([0.0, 0.0], 1.0)]);
        let reference = set(&[([1.0, 1.0], 2.0), ([2.0, 2.0], 0.0)]);
        let knn = knn2(&query, &reference, false).unwrap();
        assert_eq!(knn[0].best_idx, 0);
        assert!(ratio_test(&knn, 0.75).is_empty());
    }

    #[test]
    fn ratio_test_is_strict() {
        let m = KnnMatch {
            query_idx: 0,
            best_idx: 0,
            best_distance: 0.75,
            second_distance: 1.0,
        };
        assert!(!m.passes_ratio(0.75));
        assert!(m.passes_ratio(0.76));
    }

    #[test]
    fn correspondences_carry_keypoint_locations() {
        let object = set(&[([1.0, 2.0], 0.0), ([3.0, 4.0], 10.0)]);
        let scene = set(&[([11.0, 12.0], 0.0), ([13.0, 14.0], 10.0), ([0.0, 0.0], 5.0)]);
        let corr = good_correspondences(&object, &scene, 0.75, false).unwrap();
        assert_eq!(corr.len(), 2);
        assert_eq!(corr[0].object, [1.0, 2.0]);
        assert_eq!(corr[0].scene, [11.0, 12.0]);
        assert_eq!(corr[1].scene, [13.0, 14.0]);
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let query = set(&[([0.0, 0.0], 1.0)]);
        let mut reference = DescriptorSet::new(3);
        reference.push(kp(0.0, 0.0), &[0.0; 3]).unwrap();
        reference.push(kp(1.0, 0.0), &[1.0; 3]).unwrap();
        assert!(knn2(&query, &reference, false).is_err());
    }
}
