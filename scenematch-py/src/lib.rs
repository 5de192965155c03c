//! Python bindings for scenematch.
//!
//! Results are returned as plain `dict`/`list` values with the same shape as
//! the JSON reports: `{"matches": [...]}` from `find_features` and
//! `{"results": [...]}` from `find_templates`.

use numpy::{PyReadonlyArray2, PyUntypedArrayMethods};
use pyo3::exceptions::PyRuntimeError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use scenematch::{
    scan_template as rust_scan_template, FeatureConfig, FeatureOutcome, FeatureReport,
    FsImageStore, ImageView, Metric, SceneMatchError, TemplateBox, TemplateConfig,
    TemplateOutcome, TemplateReport,
};
use std::path::Path;

/// Convert a SceneMatchError to a Python exception.
fn to_py_err(err: SceneMatchError) -> PyErr {
    PyRuntimeError::new_err(err.to_string())
}

fn box_to_dict<'py>(py: Python<'py>, b: &TemplateBox) -> PyResult<Bound<'py, PyDict>> {
    let d = PyDict::new(py);
    d.set_item("x", b.x)?;
    d.set_item("y", b.y)?;
    d.set_item("width", b.width)?;
    d.set_item("height", b.height)?;
    d.set_item("confidence", b.confidence)?;
    Ok(d)
}

fn boxes_to_list<'py>(py: Python<'py>, boxes: &[TemplateBox]) -> PyResult<Bound<'py, PyList>> {
    let items = boxes
        .iter()
        .map(|b| box_to_dict(py, b))
        .collect::<PyResult<Vec<_>>>()?;
    PyList::new(py, items)
}

fn feature_outcome_to_dict<'py>(
    py: Python<'py>,
    outcome: &FeatureOutcome,
) -> PyResult<Bound<'py, PyDict>> {
    let d = PyDict::new(py);
    match outcome {
        FeatureOutcome::Error { message } => d.set_item("error", message)?,
        FeatureOutcome::NoDetection { matches_count } => {
            d.set_item("matchesCount", matches_count)?
        }
        FeatureOutcome::Located(q) => {
            let corners = q
                .corners
                .iter()
                .map(|c| {
                    let p = PyDict::new(py);
                    p.set_item("x", c[0])?;
                    p.set_item("y", c[1])?;
                    Ok(p)
                })
                .collect::<PyResult<Vec<_>>>()?;
            d.set_item("template", &q.template)?;
            d.set_item("corners", PyList::new(py, corners)?)?;
            d.set_item("confidence", q.confidence)?;
            d.set_item("matchesCount", q.matches_count)?;
        }
    }
    Ok(d)
}

fn feature_report_to_dict<'py>(
    py: Python<'py>,
    report: &FeatureReport,
) -> PyResult<Bound<'py, PyDict>> {
    let matches = report
        .matches
        .iter()
        .map(|o| feature_outcome_to_dict(py, o))
        .collect::<PyResult<Vec<_>>>()?;
    let d = PyDict::new(py);
    d.set_item("matches", PyList::new(py, matches)?)?;
    Ok(d)
}

fn template_outcome_to_dict<'py>(
    py: Python<'py>,
    outcome: &TemplateOutcome,
) -> PyResult<Bound<'py, PyDict>> {
    let d = PyDict::new(py);
    d.set_item("template", outcome.template())?;
    match outcome {
        TemplateOutcome::Error { message, .. } => d.set_item("error", message)?,
        TemplateOutcome::Scanned(r) => {
            d.set_item("maxConfidence", r.max_confidence)?;
            d.set_item("matches", boxes_to_list(py, &r.matches)?)?;
        }
    }
    Ok(d)
}

fn template_report_to_dict<'py>(
    py: Python<'py>,
    report: &TemplateReport,
) -> PyResult<Bound<'py, PyDict>> {
    let results = report
        .results
        .iter()
        .map(|o| template_outcome_to_dict(py, o))
        .collect::<PyResult<Vec<_>>>()?;
    let d = PyDict::new(py);
    d.set_item("results", PyList::new(py, results)?)?;
    Ok(d)
}

/// Locate object images in a scene image by feature matching.
///
/// Args:
///     scene: Path to the scene image
///     objects: Paths to the object images
///     hessian_threshold: Minimum keypoint response
///     ratio_threshold: Lowe ratio for good matches (default: 0.75)
///     parallel: Process objects in parallel (default: True)
///
/// Returns:
///     {"matches": [...]} with one entry per object, in input order
#[pyfunction]
#[pyo3(signature = (scene, objects, hessian_threshold, ratio_threshold = 0.75, parallel = true))]
fn find_features<'py>(
    py: Python<'py>,
    scene: &str,
    objects: Vec<String>,
    hessian_threshold: f64,
    ratio_threshold: f32,
    parallel: bool,
) -> PyResult<Bound<'py, PyDict>> {
    let config = FeatureConfig {
        ratio_threshold,
        parallel,
        ..FeatureConfig::new(hessian_threshold)
    };
    let report = py
        .detach(|| scenematch::find_features(&FsImageStore, Path::new(scene), &objects, &config))
        .map_err(to_py_err)?;
    feature_report_to_dict(py, &report)
}

/// Scan object images over a scene image.
///
/// Args:
///     scene: Path to the scene image
///     objects: Paths to the object images
///     method: Metric code 0..=5 (sqdiff, sqdiff_normed, ccorr, ccorr_normed,
///         ccoeff, ccoeff_normed)
///     threshold: Pass threshold; squared-difference metrics pass at or below it
///     parallel: Process objects and rows in parallel (default: True)
///
/// Returns:
///     {"results": [...]} with one entry per object, in input order
#[pyfunction]
#[pyo3(signature = (scene, objects, method, threshold, parallel = true))]
fn find_templates<'py>(
    py: Python<'py>,
    scene: &str,
    objects: Vec<String>,
    method: i32,
    threshold: f64,
    parallel: bool,
) -> PyResult<Bound<'py, PyDict>> {
    let mut config = TemplateConfig::from_code(method, threshold).map_err(to_py_err)?;
    config.parallel = parallel;
    let report = py
        .detach(|| scenematch::find_templates(&FsImageStore, Path::new(scene), &objects, &config))
        .map_err(to_py_err)?;
    template_report_to_dict(py, &report)
}

/// Scan a template array over a scene array.
///
/// Args:
///     scene: 2D uint8 numpy array (height x width)
///     template: 2D uint8 numpy array (height x width)
///     method: Metric code 0..=5
///     threshold: Pass threshold
///
/// Returns:
///     {"maxConfidence": float, "best": {...}, "matches": [...]}
#[pyfunction]
#[pyo3(signature = (scene, template, method, threshold, parallel = false))]
fn scan_template<'py>(
    py: Python<'py>,
    scene: PyReadonlyArray2<'py, u8>,
    template: PyReadonlyArray2<'py, u8>,
    method: i32,
    threshold: f64,
    parallel: bool,
) -> PyResult<Bound<'py, PyDict>> {
    let metric = Metric::from_code(method).map_err(to_py_err)?;
    let scene_shape = scene.shape();
    let scene_view =
        ImageView::from_slice(scene.as_slice()?, scene_shape[1], scene_shape[0]).map_err(to_py_err)?;
    let tpl_shape = template.shape();
    let tpl_view =
        ImageView::from_slice(template.as_slice()?, tpl_shape[1], tpl_shape[0]).map_err(to_py_err)?;

    let scan = rust_scan_template(scene_view, tpl_view, metric, threshold, parallel)
        .map_err(to_py_err)?;
    let d = PyDict::new(py);
    d.set_item("maxConfidence", scan.max_confidence)?;
    d.set_item("best", box_to_dict(py, &scan.best)?)?;
    d.set_item("matches", boxes_to_list(py, &scan.matches)?)?;
    Ok(d)
}

/// Python module for scenematch.
#[pymodule]
fn _scenematch(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(find_features, m)?)?;
    m.add_function(wrap_pyfunction!(find_templates, m)?)?;
    m.add_function(wrap_pyfunction!(scan_template, m)?)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
