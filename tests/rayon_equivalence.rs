#![cfg(feature = "rayon")]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scenematch::search::score_map;
use scenematch::{
    find_features, find_templates, FeatureConfig, ImageView, MemoryImageStore, Metric, OwnedImage,
    TemplateConfig,
};
use std::path::Path;

fn make_scene(width: usize, height: usize, seed: u64) -> OwnedImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![50u8; width * height];
    for _ in 0..60 {
        let w = rng.random_range(6..24);
        let h = rng.random_range(6..24);
        let x0 = rng.random_range(0..width - w);
        let y0 = rng.random_range(0..height - h);
        let value: u8 = rng.random();
        for y in y0..y0 + h {
            data[y * width + x0..y * width + x0 + w].fill(value);
        }
    }
    OwnedImage::new(data, width, height).unwrap()
}

fn crop(image: &OwnedImage, x: usize, y: usize, w: usize, h: usize) -> OwnedImage {
    OwnedImage::from_view(image.view().roi(x, y, w, h).unwrap()).unwrap()
}

#[test]
fn parallel_score_maps_match_sequential() {
    let scene = make_scene(96, 80, 1);
    let object = crop(&scene, 20, 30, 17, 13);
    let sv: ImageView<'_, u8> = scene.view();
    for metric in Metric::ALL {
        let seq = score_map(sv, object.view(), metric, false).unwrap();
        let par = score_map(sv, object.view(), metric, true).unwrap();
        assert_eq!(seq, par, "{metric:?}");
    }
}

#[test]
fn parallel_templates_match_sequential() {
    let scene = make_scene(120, 90, 2);
    let store = MemoryImageStore::new()
        .with("scene.png", scene.clone())
        .with("a.png", crop(&scene, 10, 10, 20, 20))
        .with("b.png", crop(&scene, 70, 40, 24, 16))
        .with("big.png", OwnedImage::filled(200, 10, 0).unwrap());
    let objects = ["a.png", "missing.png", "b.png", "big.png"];

    let seq_cfg = TemplateConfig {
        metric: Metric::CCoeffNormed,
        threshold: 0.95,
        parallel: false,
    };
    let par_cfg = TemplateConfig {
        parallel: true,
        ..seq_cfg.clone()
    };
    let seq = find_templates(&store, Path::new("scene.png"), &objects, &seq_cfg).unwrap();
    let par = find_templates(&store, Path::new("scene.png"), &objects, &par_cfg).unwrap();
    assert_eq!(seq, par);
}

#[test]
fn parallel_features_match_sequential() {
    let scene = make_scene(256, 192, 3);
    let store = MemoryImageStore::new()
        .with("scene.png", scene.clone())
        .with("a.png", crop(&scene, 32, 32, 128, 128))
        .with("b.png", crop(&scene, 96, 48, 144, 128))
        .with("blank.png", OwnedImage::filled(50, 50, 10).unwrap());
    let objects = ["a.png", "blank.png", "missing.png", "b.png"];

    let seq_cfg = FeatureConfig::new(100.0);
    let par_cfg = FeatureConfig {
        parallel: true,
        ..seq_cfg.clone()
    };
    let seq = find_features(&store, Path::new("scene.png"), &objects, &seq_cfg).unwrap();
    let par = find_features(&store, Path::new("scene.png"), &objects, &par_cfg).unwrap();
    assert_eq!(seq, par);
    assert_eq!(par.matches.len(), 4);
}
