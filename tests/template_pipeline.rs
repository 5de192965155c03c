use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scenematch::{
    find_templates, MemoryImageStore, Metric, NmsConfig, OwnedImage, SceneMatchError,
    TemplateConfig, TemplateOutcome,
};
use std::path::Path;

fn noise_image(width: usize, height: usize, seed: u64) -> OwnedImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..width * height).map(|_| rng.random::<u8>()).collect();
    OwnedImage::new(data, width, height).unwrap()
}

fn crop(image: &OwnedImage, x: usize, y: usize, w: usize, h: usize) -> OwnedImage {
    OwnedImage::from_view(image.view().roi(x, y, w, h).unwrap()).unwrap()
}

fn config(metric: Metric, threshold: f64) -> TemplateConfig {
    TemplateConfig {
        metric,
        threshold,
        parallel: false,
    }
}

#[test]
fn all_zero_sqdiff_reports_every_offset() {
    let store = MemoryImageStore::new()
        .with("scene.png", OwnedImage::filled(100, 100, 0).unwrap())
        .with("zero.png", OwnedImage::filled(10, 10, 0).unwrap());

    let report = find_templates(
        &store,
        Path::new("scene.png"),
        &["zero.png"],
        &config(Metric::SqDiff, 0.0),
    )
    .unwrap();
    let result = report.results[0].scanned().expect("scan should succeed");
    assert_eq!(result.template, "zero.png");
    assert_eq!(result.max_confidence, 0.0);
    assert_eq!(result.matches.len(), 91 * 91);
    for (i, m) in result.matches.iter().enumerate() {
        assert_eq!((m.x, m.y), (i % 91, i / 91));
        assert_eq!((m.width, m.height), (10, 10));
        assert_eq!(m.confidence, 0.0);
    }
}

#[test]
fn identical_subregion_scores_zero_sqdiff() {
    let scene = noise_image(60, 50, 1);
    let object = crop(&scene, 17, 9, 12, 10);
    let store = MemoryImageStore::new()
        .with("scene.png", scene)
        .with("patch.png", object);

    let report = find_templates(
        &store,
        Path::new("scene.png"),
        &["patch.png"],
        &config(Metric::SqDiff, 0.0),
    )
    .unwrap();
    let result = report.results[0].scanned().unwrap();
    assert_eq!(result.matches.len(), 1);
    let m = result.matches[0];
    assert_eq!((m.x, m.y, m.confidence), (17, 9, 0.0));
    assert_eq!((result.best.x, result.best.y), (17, 9));
    assert!(result.max_confidence > 0.0);
}

#[test]
fn normalized_correlation_peaks_at_the_source() {
    let scene = noise_image(80, 60, 2);
    let object = crop(&scene, 40, 22, 16, 16);
    let store = MemoryImageStore::new()
        .with("scene.png", scene)
        .with("patch.png", object);

    for metric in [Metric::CCorrNormed, Metric::CCoeffNormed] {
        let report = find_templates(
            &store,
            Path::new("scene.png"),
            &["patch.png"],
            &config(metric, 0.99),
        )
        .unwrap();
        let result = report.results[0].scanned().unwrap();
        assert_eq!((result.best.x, result.best.y), (40, 22), "{metric:?}");
        assert!((result.max_confidence - 1.0).abs() < 1e-9);
        assert_eq!(result.matches.len(), 1, "{metric:?}");
    }
}

#[test]
fn normalized_scores_stay_in_range() {
    let scene = noise_image(40, 30, 3);
    let object = noise_image(8, 6, 4);
    let store = MemoryImageStore::new()
        .with("scene.png", scene)
        .with("patch.png", object);

    for metric in [Metric::SqDiffNormed, Metric::CCorrNormed, Metric::CCoeffNormed] {
        let report = find_templates(
            &store,
            Path::new("scene.png"),
            &["patch.png"],
            &config(metric, f64::MIN),
        )
        .unwrap();
        let result = report.results[0].scanned().unwrap();
        let passing = if metric.is_sq_diff() { 0 } else { 33 * 25 };
        assert_eq!(result.matches.len(), passing, "{metric:?}");
        assert!(result.max_confidence <= 1.0);
    }
}

#[test]
fn per_object_failures_are_isolated() {
    let scene = noise_image(30, 30, 5);
    let small = crop(&scene, 0, 0, 5, 5);
    let store = MemoryImageStore::new()
        .with("scene.png", scene)
        .with("small.png", small)
        .with("large.png", OwnedImage::filled(40, 10, 0).unwrap());
    let objects = ["large.png", "missing.png", "small.png"];

    let report = find_templates(
        &store,
        Path::new("scene.png"),
        &objects,
        &config(Metric::SqDiff, 0.0),
    )
    .unwrap();
    assert_eq!(report.results.len(), 3);
    assert_eq!(
        report.results[0],
        TemplateOutcome::Error {
            template: "large.png".to_string(),
            message: "Scene image is smaller than template image".to_string(),
        }
    );
    assert_eq!(
        report.results[1],
        TemplateOutcome::Error {
            template: "missing.png".to_string(),
            message: "Failed to load object image".to_string(),
        }
    );
    assert_eq!(report.results[2].template(), "small.png");
    assert!(report.results[2].scanned().is_some());
}

#[test]
fn missing_scene_fails_the_call() {
    let store = MemoryImageStore::new();
    let err = find_templates(
        &store,
        Path::new("scene.png"),
        &["a.png"],
        &TemplateConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, SceneMatchError::SceneLoad { .. }));
}

#[test]
fn suppression_merges_overlapping_hits() {
    let mut data = vec![0u8; 64 * 32];
    for (x0, y0) in [(4usize, 4usize), (40, 12)] {
        for y in y0..y0 + 8 {
            for x in x0..x0 + 8 {
                data[y * 64 + x] = ((x - x0) * 30 + (y - y0) * 5) as u8;
            }
        }
    }
    let scene = OwnedImage::new(data, 64, 32).unwrap();
    let object = crop(&scene, 4, 4, 8, 8);
    let store = MemoryImageStore::new()
        .with("scene.png", scene)
        .with("tile.png", object);

    let cfg = config(Metric::CCoeffNormed, 0.9);
    let report = find_templates(&store, Path::new("scene.png"), &["tile.png"], &cfg).unwrap();
    let raw = report.results[0].scanned().unwrap().matches.len();
    assert!(raw >= 2);

    let kept = report.suppressed(cfg.metric.polarity(), &NmsConfig::default());
    let mut positions: Vec<(usize, usize)> = kept.iter().map(|b| (b.bbox.x, b.bbox.y)).collect();
    positions.sort_unstable();
    assert_eq!(positions, vec![(4, 4), (40, 12)]);
}
