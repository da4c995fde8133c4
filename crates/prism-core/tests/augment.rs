//! End-to-end tests running pipelines over real directories.

use image::{Rgb, RgbImage};
use prism_core::{Pipeline, PipelineError, Recipe, TransformStep};
use std::collections::BTreeMap;
use std::path::Path;

fn gradient(width: u32, height: u32, seed: u8) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 7) as u8 ^ seed,
            (y * 13) as u8,
            seed.wrapping_add((x + y) as u8),
        ])
    })
}

fn write_sources(dir: &Path) {
    gradient(12, 8, 1).save(dir.join("alpha.png")).unwrap();
    gradient(9, 15, 2).save(dir.join("beta.png")).unwrap();
    gradient(16, 16, 3).save(dir.join("gamma.png")).unwrap();
}

fn snapshot(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| {
            let path = entry.unwrap().path();
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            (name, std::fs::read(&path).unwrap())
        })
        .collect()
}

#[tokio::test]
async fn rotations_that_cancel_reproduce_sources() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_sources(input.path());

    let mut pipeline = Pipeline::new(input.path(), output.path()).unwrap();
    pipeline.add_step(TransformStep::rotate90(1.0)).unwrap();
    pipeline.add_step(TransformStep::rotate270(1.0)).unwrap();
    let report = pipeline.process().await.unwrap();

    assert_eq!(report.written(), 3);
    for record in &report.images {
        assert_eq!(record.applied, ["rotate90", "rotate270"]);
        let name = record.output.file_name().unwrap().to_string_lossy();
        assert!(name.contains("__rotate90+rotate270__"), "{name}");

        let source = image::open(&record.source).unwrap().to_rgb8();
        let produced = image::open(&record.output).unwrap().to_rgb8();
        assert_eq!(source, produced);
    }
}

#[tokio::test]
async fn sources_are_never_modified() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_sources(input.path());
    let before = snapshot(input.path());

    let mut pipeline = Pipeline::with_seed(input.path(), output.path(), 99).unwrap();
    pipeline.add_step(TransformStep::zoom(1.0, 1.05, 1.2)).unwrap();
    pipeline.add_step(TransformStep::hue_shift(0.5, -40, 40)).unwrap();
    pipeline.add_step(TransformStep::random_distortion(0.5, 2, 2, 2)).unwrap();
    pipeline.process().await.unwrap();
    pipeline.process().await.unwrap();

    assert_eq!(snapshot(input.path()), before);
}

#[tokio::test]
async fn output_count_is_inputs_times_calls() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_sources(input.path());

    let mut pipeline = Pipeline::new(input.path(), output.path()).unwrap();
    pipeline.add_step(TransformStep::flip_horizontal(0.5)).unwrap();
    for _ in 0..4 {
        pipeline.process().await.unwrap();
    }

    assert_eq!(snapshot(output.path()).len(), 3 * 4);
}

#[tokio::test]
async fn same_seed_gives_identical_outputs() {
    let input = tempfile::tempdir().unwrap();
    write_sources(input.path());
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();

    for out in [first.path(), second.path()] {
        let mut pipeline = Pipeline::with_seed(input.path(), out, 2024).unwrap();
        pipeline.add_step(TransformStep::zoom(0.5, 1.0, 1.5)).unwrap();
        pipeline.add_step(TransformStep::flip_vertical(0.5)).unwrap();
        pipeline.add_step(TransformStep::hue_shift(0.7, -90, 90)).unwrap();
        pipeline.sample(6).await.unwrap();
    }

    let a = snapshot(first.path());
    assert_eq!(a.len(), 6);
    assert_eq!(a, snapshot(second.path()));
}

#[tokio::test]
async fn corrupt_image_is_unsupported() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    std::fs::write(input.path().join("broken.png"), b"definitely not a png").unwrap();

    let mut pipeline = Pipeline::new(input.path(), output.path()).unwrap();
    pipeline.add_step(TransformStep::flip_horizontal(1.0)).unwrap();
    let err = pipeline.process().await.unwrap_err();

    assert!(matches!(err, PipelineError::UnsupportedFormat { .. }), "{err}");
}

#[tokio::test]
async fn truncated_image_is_unsupported() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let full = input.path().join("full.png");
    gradient(32, 32, 4).save(&full).unwrap();
    let bytes = std::fs::read(&full).unwrap();
    std::fs::remove_file(&full).unwrap();
    std::fs::write(input.path().join("half.png"), &bytes[..bytes.len() / 2]).unwrap();

    let mut pipeline = Pipeline::new(input.path(), output.path()).unwrap();
    pipeline.add_step(TransformStep::rotate90(1.0)).unwrap();
    let err = pipeline.process().await.unwrap_err();

    assert!(matches!(err, PipelineError::UnsupportedFormat { .. }), "{err}");
    assert_eq!(snapshot(output.path()).len(), 0);
}

#[tokio::test]
async fn nested_output_dir_is_not_reprocessed() {
    let input = tempfile::tempdir().unwrap();
    write_sources(input.path());
    let nested = input.path().join("augmented");

    let mut pipeline = Pipeline::new(input.path(), &nested).unwrap();
    pipeline.add_step(TransformStep::flip_vertical(1.0)).unwrap();
    pipeline.process().await.unwrap();
    let report = pipeline.process().await.unwrap();

    assert_eq!(report.written(), 3);
    assert_eq!(snapshot(&nested).len(), 6);
}

#[tokio::test]
async fn default_recipe_writes_three_variants_per_image() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_sources(input.path());

    let recipe = Recipe::default_recipe();
    let config = prism_core::Config::default();
    let mut written = 0;
    for (i, spec) in recipe.pipelines.iter().enumerate() {
        let mut pipeline = spec
            .build(input.path(), output.path(), &config, Some(i as u64))
            .unwrap();
        written += spec.run(&mut pipeline).await.unwrap().written();
    }

    assert_eq!(written, recipe.expected_outputs(3));
    let names: Vec<String> = snapshot(output.path()).into_keys().collect();
    assert!(names.iter().any(|n| n.starts_with("alpha__flip_horizontal__")));
    assert!(names.iter().any(|n| n.starts_with("alpha__zoom__")));
    assert!(names.iter().any(|n| n.starts_with("alpha__flip_horizontal+zoom__")));
}
