use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};
use oralscan::{LabelMap, Prediction, Preprocessor, PreprocessorConfig};

fn vit_preprocessor() -> Preprocessor {
    Preprocessor::new(PreprocessorConfig::default())
}

fn bench_preprocessing(c: &mut Criterion) {
    let preprocessor = vit_preprocessor();
    let mut group = c.benchmark_group("Preprocessing");

    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    // Photos from phone cameras and intraoral scanners vary a lot in size
    for (name, width, height) in [("small", 224, 224), ("medium", 1024, 768), ("large", 4032, 3024)] {
        let image = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        group.bench_function(name, |b| b.iter(|| {
            preprocessor.preprocess(black_box(&image)).unwrap()
        }));
    }

    group.finish();
}

fn bench_result_mapping(c: &mut Criterion) {
    let labels = LabelMap::from_json(r#"{"id2label": {"0": "LABEL_0", "1": "LABEL_1"}}"#).unwrap();
    let mut group = c.benchmark_group("ResultMapping");

    group.bench_function("two_classes", |b| b.iter(|| {
        Prediction::from_logits(black_box(&[2.0, -1.0]), &labels).unwrap()
    }));

    let many: Vec<f32> = (0..1000).map(|i| (i as f32).sin()).collect();
    group.bench_function("thousand_classes", |b| b.iter(|| {
        Prediction::from_logits(black_box(&many), &labels).unwrap()
    }));

    group.finish();
}

criterion_group!(
    benches,
    bench_preprocessing,
    bench_result_mapping
);
criterion_main!(benches);
