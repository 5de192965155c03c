//! Rayon-parallel scans (feature-gated).
//!
//! Rows of placements are scored independently, so the parallel scan writes
//! the same values as [`scan_full`](crate::kernel::scalar::scan_full).

use crate::image::{ImageView, IntegralImage};
use crate::kernel::scalar::score_row;
use crate::kernel::{Kernel, ScoreMap};
use crate::template::TemplatePlan;
use rayon::prelude::*;

/// Row-parallel full scan.
///
/// `integral` must be built from `image` with squares. The caller guarantees
/// the template fits inside the image.
pub fn scan_full_par<K: Kernel>(
    image: ImageView<'_, u8>,
    integral: &IntegralImage,
    plan: &TemplatePlan,
) -> ScoreMap {
    let nx = image.width() - plan.width() + 1;
    let ny = image.height() - plan.height() + 1;
    let mut data = vec![0.0f64; nx * ny];
    data.par_chunks_mut(nx)
        .enumerate()
        .for_each(|(y, row)| score_row::<K>(image, integral, plan, y, row));
    ScoreMap::from_parts(nx, ny, data)
}
