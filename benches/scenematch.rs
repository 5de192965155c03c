use criterion::{criterion_group, criterion_main, Criterion};
use scenematch::search::score_map;
use scenematch::{
    extract, good_correspondences, ImageView, Metric, OwnedImage, RansacConfig, SurfConfig,
};
use std::hint::black_box;

fn make_image(width: usize, height: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let value = ((x * 13) ^ (y * 7) ^ (x * y)) & 0xFF;
            data.push(value as u8);
        }
    }
    data
}

fn bench_features(c: &mut Criterion) {
    let (width, height) = (512, 384);
    let image = make_image(width, height);
    let view = ImageView::from_slice(&image, width, height).unwrap();
    let object = OwnedImage::from_view(view.roi(128, 96, 192, 160).unwrap()).unwrap();
    let cfg = SurfConfig::default();

    c.bench_function("extract_512x384", |b| {
        b.iter(|| black_box(extract(view, 400.0, &cfg).unwrap()));
    });

    let scene_set = extract(view, 400.0, &cfg).unwrap();
    let object_set = extract(object.view(), 400.0, &cfg).unwrap();
    c.bench_function("knn_ratio_match", |b| {
        b.iter(|| black_box(good_correspondences(&object_set, &scene_set, 0.75, false).unwrap()));
    });

    let good = good_correspondences(&object_set, &scene_set, 0.75, false).unwrap();
    if good.len() >= scenematch::MIN_CORRESPONDENCES {
        let ransac = RansacConfig::default();
        c.bench_function("verify_homography", |b| {
            b.iter(|| black_box(scenematch::verify(&good, 192, 160, &ransac).unwrap()));
        });
    }
}

fn bench_templates(c: &mut Criterion) {
    let (width, height) = (320, 240);
    let image = make_image(width, height);
    let view = ImageView::from_slice(&image, width, height).unwrap();
    let object = OwnedImage::from_view(view.roi(100, 80, 32, 24).unwrap()).unwrap();

    for metric in [Metric::SqDiff, Metric::CCoeffNormed] {
        c.bench_function(&format!("scan_{metric:?}_seq"), |b| {
            b.iter(|| black_box(score_map(view, object.view(), metric, false).unwrap()));
        });
        #[cfg(feature = "rayon")]
        c.bench_function(&format!("scan_{metric:?}_par"), |b| {
            b.iter(|| black_box(score_map(view, object.view(), metric, true).unwrap()));
        });
    }
}

criterion_group!(benches, bench_features, bench_templates);
criterion_main!(benches);
