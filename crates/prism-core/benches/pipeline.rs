//! Benchmarks for the Prism augmentation pipeline.
//!
//! Run with: cargo bench -p prism-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, ImageFormat};
use prism_core::config::{LimitsConfig, OutputConfig};
use prism_core::pipeline::{ImageDecoder, ImageEncoder};
use prism_core::transform::{DistortionGrid, Operation, Plan};
use prism_core::TransformStep;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Cursor;
use std::path::Path;

fn photo() -> DynamicImage {
    DynamicImage::new_rgb8(1024, 768)
}

fn benchmark_plan_draw(c: &mut Criterion) {
    let steps = vec![
        TransformStep::zoom(0.5, 1.05, 1.2),
        TransformStep::flip_horizontal(0.5),
        TransformStep::hue_shift(0.5, -30, 30),
        TransformStep::random_distortion(0.5, 4, 4, 8),
    ];
    let mut rng = StdRng::seed_from_u64(7);

    c.bench_function("plan_draw", |b| {
        b.iter(|| Plan::draw(black_box(&steps), &mut rng))
    });
}

fn benchmark_flip(c: &mut Criterion) {
    let img = photo();
    c.bench_function("flip_horizontal_1024", |b| {
        b.iter(|| Operation::FlipHorizontal.apply(black_box(img.clone())))
    });
}

fn benchmark_zoom(c: &mut Criterion) {
    let img = photo();
    let op = Operation::Zoom { factor: 1.12 };
    c.bench_function("zoom_1024", |b| b.iter(|| op.apply(black_box(img.clone()))));
}

fn benchmark_hue_shift(c: &mut Criterion) {
    let img = photo();
    let op = Operation::HueShift { degrees: 25 };
    c.bench_function("hue_shift_1024", |b| {
        b.iter(|| op.apply(black_box(img.clone())))
    });
}

fn benchmark_distortion(c: &mut Criterion) {
    let img = photo();
    let mut rng = StdRng::seed_from_u64(11);
    let op = Operation::Distort(DistortionGrid::draw(&mut rng, 4, 4, 8));
    c.bench_function("random_distortion_4x4_1024", |b| {
        b.iter(|| op.apply(black_box(img.clone())))
    });
}

fn benchmark_decode(c: &mut Criterion) {
    let mut buf = Cursor::new(Vec::new());
    photo().write_to(&mut buf, ImageFormat::Png).unwrap();
    let bytes = buf.into_inner();

    let decoder = ImageDecoder::new(LimitsConfig::default());
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("decode_png_1024", |b| {
        b.iter(|| {
            let _ = rt.block_on(
                decoder.decode_from_bytes(black_box(bytes.clone()), Path::new("bench.png")),
            );
        })
    });
}

fn benchmark_encode(c: &mut Criterion) {
    let img = photo();
    let encoder = ImageEncoder::new(OutputConfig::default());

    c.bench_function("encode_jpeg_1024", |b| {
        b.iter(|| {
            let _ = encoder.encode(black_box(&img), ImageFormat::Jpeg, Path::new("bench.jpg"));
        })
    });
}

criterion_group!(
    benches,
    benchmark_plan_draw,
    benchmark_flip,
    benchmark_zoom,
    benchmark_hue_shift,
    benchmark_distortion,
    benchmark_decode,
    benchmark_encode,
);
criterion_main!(benches);
