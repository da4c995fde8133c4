//! Running a recipe with a progress bar, summary and optional manifest.

use indicatif::ProgressBar;
use prism_core::pipeline::FileDiscovery;
use prism_core::{write_manifest, AugmentedImage, ProcessReport};
use std::time::Instant;

use super::ProcessContext;

/// Run every pipeline of the recipe in order.
pub async fn run_recipe(ctx: ProcessContext) -> anyhow::Result<()> {
    let ProcessContext {
        config,
        recipe,
        input,
        output,
        manifest,
        manifest_format,
        seed,
    } = ctx;

    // Compare canonical paths so a nested output dir is excluded from the count.
    let canonical_input = input.canonicalize()?;
    let files = FileDiscovery::new(config.processing.clone())
        .discover(&canonical_input, output.canonicalize().ok().as_deref())?;
    let sources = files.len();
    if sources == 0 {
        tracing::warn!("No supported image files found in {:?}", input);
        return Ok(());
    }
    let source_bytes = FileDiscovery::total_size(&files);
    let total = recipe.expected_outputs(sources);
    tracing::info!("Found {} image(s), writing {} file(s)", sources, total);

    let start = Instant::now();
    let progress = create_progress_bar(total as u64);
    let mut records: Vec<AugmentedImage> = Vec::with_capacity(total);

    for (index, spec) in recipe.pipelines.iter().enumerate() {
        let pb = progress.clone();
        let mut pipeline = spec
            .build(
                &input,
                &output,
                &config,
                seed.map(|s| s.wrapping_add(index as u64)),
            )?
            .on_progress(move |record| {
                pb.inc(1);
                if let Some(name) = record.output.file_name() {
                    pb.set_message(name.to_string_lossy().into_owned());
                }
            });
        progress.set_message(spec.name.clone());

        match spec.run(&mut pipeline).await {
            Ok(report) => records.extend(report.images),
            Err(e) => {
                progress.abandon_with_message(format!("failed in {}", spec.name));
                return Err(anyhow::anyhow!("Pipeline {:?} failed: {e}", spec.name));
            }
        }
    }
    progress.finish_with_message("done");

    let report = ProcessReport {
        images: records,
        elapsed: start.elapsed(),
    };
    if let Some(path) = &manifest {
        let written = write_manifest(path, &report.images, manifest_format)?;
        tracing::info!("Manifest with {} record(s) written to {:?}", written, path);
    }

    print_summary(sources, source_bytes, &report, recipe.pipelines.len());
    Ok(())
}

/// Create a progress bar for recipe runs.
fn create_progress_bar(total: u64) -> ProgressBar {
    use indicatif::ProgressStyle;

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table after the recipe ran.
fn print_summary(sources: usize, source_bytes: u64, report: &ProcessReport, pipelines: usize) {
    let unchanged = report
        .images
        .iter()
        .filter(|r| r.applied.is_empty())
        .count();

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Sources:      {:>8}", sources);
    eprintln!("    Source data:  {:>7.1} MB", source_bytes as f64 / 1_000_000.0);
    eprintln!("    Pipelines:    {:>8}", pipelines);
    eprintln!("    Written:      {:>8}", report.written());
    if unchanged > 0 {
        eprintln!("    Unchanged:    {:>8}", unchanged);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Duration:     {:>7.1}s", report.elapsed.as_secs_f64());
    eprintln!("    Rate:         {:>7.1} img/sec", report.images_per_second());
    eprintln!("  ====================================");
}
