//! Dense template scan with metric dispatch.

use crate::image::{ImageView, IntegralImage};
use crate::kernel::scalar::{CCoeff, CCoeffNormed, CCorr, CCorrNormed, SqDiff, SqDiffNormed};
use crate::kernel::{Kernel, ScoreMap};
use crate::search::{Metric, TemplateBox, TemplateScan};
use crate::template::TemplatePlan;
use crate::trace::{trace_event, trace_span};
use crate::util::{SceneMatchError, SceneMatchResult};

/// Scores every placement of `object` over `scene` with `metric`.
///
/// Fails with [`SceneMatchError::TemplateLargerThanScene`] when the object
/// does not fit in either axis. With the `rayon` feature and `parallel` set,
/// rows are scored in parallel; the map is identical either way.
pub fn score_map(
    scene: ImageView<'_, u8>,
    object: ImageView<'_, u8>,
    metric: Metric,
    parallel: bool,
) -> SceneMatchResult<ScoreMap> {
    if !scene.fits(object.width(), object.height()) {
        return Err(SceneMatchError::TemplateLargerThanScene {
            scene_width: scene.width(),
            scene_height: scene.height(),
            template_width: object.width(),
            template_height: object.height(),
        });
    }
    let plan = TemplatePlan::from_view(object)?;
    let integral = IntegralImage::with_squares(scene);
    let map = match metric {
        Metric::SqDiff => dispatch::<SqDiff>(scene, &integral, &plan, parallel),
        Metric::SqDiffNormed => dispatch::<SqDiffNormed>(scene, &integral, &plan, parallel),
        Metric::CCorr => dispatch::<CCorr>(scene, &integral, &plan, parallel),
        Metric::CCorrNormed => dispatch::<CCorrNormed>(scene, &integral, &plan, parallel),
        Metric::CCoeff => dispatch::<CCoeff>(scene, &integral, &plan, parallel),
        Metric::CCoeffNormed => dispatch::<CCoeffNormed>(scene, &integral, &plan, parallel),
    };
    Ok(map)
}

fn dispatch<K: Kernel>(
    scene: ImageView<'_, u8>,
    integral: &IntegralImage,
    plan: &TemplatePlan,
    parallel: bool,
) -> ScoreMap {
    #[cfg(feature = "rayon")]
    {
        if parallel {
            return crate::kernel::rayon::scan_full_par::<K>(scene, integral, plan);
        }
    }
    #[cfg(not(feature = "rayon"))]
    let _ = parallel;
    crate::kernel::scalar::scan_full::<K>(scene, integral, plan)
}

/// Scans `object` over `scene` and collects placements passing `threshold`.
///
/// Squared-difference metrics pass with `score <= threshold`, correlation
/// metrics with `score >= threshold`. The global maximum and the best
/// placement are reported even when nothing passes.
pub fn scan_template(
    scene: ImageView<'_, u8>,
    object: ImageView<'_, u8>,
    metric: Metric,
    threshold: f64,
    parallel: bool,
) -> SceneMatchResult<TemplateScan> {
    if !threshold.is_finite() {
        return Err(SceneMatchError::InvalidInput("threshold must be finite"));
    }
    let _span = trace_span!(
        "scan_template",
        metric = metric.code(),
        width = object.width(),
        height = object.height()
    )
    .entered();

    let map = score_map(scene, object, metric, parallel)?;
    let (width, height) = (object.width(), object.height());
    let polarity = metric.polarity();
    let at = |x: usize, y: usize, confidence: f64| TemplateBox {
        x,
        y,
        width,
        height,
        confidence,
    };

    let mut max_confidence = f64::NEG_INFINITY;
    let mut best: Option<TemplateBox> = None;
    let mut matches = Vec::new();
    for (x, y, score) in map.iter() {
        if score > max_confidence {
            max_confidence = score;
        }
        if best.map_or(true, |b| polarity.is_better(score, b.confidence)) {
            best = Some(at(x, y, score));
        }
        if polarity.passes(score, threshold) {
            matches.push(at(x, y, score));
        }
    }
    let best = best.unwrap_or_else(|| at(0, 0, max_confidence));

    trace_event!("scan_done", passing = matches.len(), max = max_confidence);
    Ok(TemplateScan {
        max_confidence,
        best,
        matches,
    })
}
