//! The augmentation pipeline: an ordered list of probabilistic steps bound to
//! an input and an output directory.

use futures_util::stream::{self, StreamExt, TryStreamExt};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::transform::{Plan, TransformStep};
use crate::types::{AugmentedImage, ProcessReport};

use super::decode::{format_to_string, ImageDecoder};
use super::discovery::{DiscoveredFile, FileDiscovery};
use super::encode::{write_unique, EncodedImage, ImageEncoder};
use super::validate::Validator;

/// Callback invoked after each file is written.
pub type ProgressFn = Arc<dyn Fn(&AugmentedImage) + Send + Sync>;

/// One source image and the operations drawn for it.
struct Job {
    source: PathBuf,
    plan: Plan,
}

/// A job whose pixels are done and encoded, waiting for a filename.
struct Rendered {
    source: PathBuf,
    base: String,
    applied: Vec<String>,
    encoded: EncodedImage,
    width: u32,
    height: u32,
}

/// Ordered probabilistic steps applied to every image of `input_dir`, with
/// results written to `output_dir`.
///
/// Source files are only ever read. Every call to [`Pipeline::process`]
/// writes exactly one new file per source image and never replaces an
/// existing file.
pub struct Pipeline<R = StdRng> {
    input_dir: PathBuf,
    output_dir: PathBuf,
    steps: Vec<TransformStep>,
    rng: R,
    workers: usize,
    discovery: FileDiscovery,
    validator: Validator,
    decoder: ImageDecoder,
    encoder: ImageEncoder,
    progress: Option<ProgressFn>,
}

impl Pipeline<StdRng> {
    /// Create a pipeline seeded from system entropy.
    pub fn new(
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> PipelineResult<Self> {
        Self::with_rng(input_dir, output_dir, StdRng::from_entropy())
    }

    /// Create a reproducible pipeline from a fixed seed.
    pub fn with_seed(
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        seed: u64,
    ) -> PipelineResult<Self> {
        Self::with_rng(input_dir, output_dir, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Pipeline<R> {
    /// Create a pipeline drawing its decisions from `rng`.
    ///
    /// Fails with `SameDirectory` when the output directory is the input
    /// directory.
    pub fn with_rng(
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        rng: R,
    ) -> PipelineResult<Self> {
        let input_dir = input_dir.into();
        let output_dir = output_dir.into();
        ensure_distinct(&input_dir, &output_dir)?;

        let config = Config::default();
        Ok(Self {
            input_dir,
            output_dir,
            steps: Vec::new(),
            rng,
            workers: config.processing.parallel_workers,
            discovery: FileDiscovery::new(config.processing),
            validator: Validator::new(config.limits.clone()),
            decoder: ImageDecoder::new(config.limits),
            encoder: ImageEncoder::new(config.output),
            progress: None,
        })
    }

    /// Apply processing, limit and output settings from `config`.
    pub fn with_config(mut self, config: &Config) -> Self {
        self.workers = config.processing.parallel_workers.max(1);
        self.discovery = FileDiscovery::new(config.processing.clone());
        self.validator = Validator::new(config.limits.clone());
        self.decoder = ImageDecoder::new(config.limits.clone());
        self.encoder = ImageEncoder::new(config.output.clone());
        self
    }

    /// Register a callback run after each file is written.
    pub fn on_progress(
        mut self,
        callback: impl Fn(&AugmentedImage) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// Append a step. On an invalid step the pipeline is left unchanged.
    pub fn add_step(&mut self, step: TransformStep) -> PipelineResult<()> {
        step.validate()?;
        self.steps.push(step);
        Ok(())
    }

    pub fn steps(&self) -> &[TransformStep] {
        &self.steps
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Run every source image through the steps once.
    pub async fn process(&mut self) -> PipelineResult<ProcessReport> {
        let start = Instant::now();
        let (input, output) = self.prepare_dirs()?;
        let files = self.discovery.discover(&input, Some(&output))?;
        tracing::debug!(
            "Processing {} image(s) from {:?} with {} step(s)",
            files.len(),
            input,
            self.steps.len()
        );

        let jobs: Vec<Job> = files
            .into_iter()
            .map(|file| Job {
                plan: Plan::draw(&self.steps, &mut self.rng),
                source: file.path,
            })
            .collect();

        self.finish(jobs, &output, start).await
    }

    /// Draw `count` source images uniformly with replacement and run each
    /// through the steps.
    pub async fn sample(&mut self, count: usize) -> PipelineResult<ProcessReport> {
        let start = Instant::now();
        let (input, output) = self.prepare_dirs()?;
        let files = self.discovery.discover(&input, Some(&output))?;
        if files.is_empty() {
            return Err(PipelineError::NoImages(input));
        }
        tracing::debug!("Sampling {} of {} image(s) from {:?}", count, files.len(), input);

        let jobs: Vec<Job> = (0..count)
            .map(|_| {
                let file: &DiscoveredFile = &files[self.rng.gen_range(0..files.len())];
                Job {
                    source: file.path.clone(),
                    plan: Plan::draw(&self.steps, &mut self.rng),
                }
            })
            .collect();

        self.finish(jobs, &output, start).await
    }

    /// Resolve both directories, creating the output one.
    fn prepare_dirs(&self) -> PipelineResult<(PathBuf, PathBuf)> {
        let input = self
            .input_dir
            .canonicalize()
            .map_err(|e| PipelineError::io(&self.input_dir, e))?;
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| PipelineError::io(&self.output_dir, e))?;
        let output = self
            .output_dir
            .canonicalize()
            .map_err(|e| PipelineError::io(&self.output_dir, e))?;
        if input == output {
            return Err(PipelineError::SameDirectory(output));
        }
        Ok((input, output))
    }

    /// Render jobs concurrently and write them in job order.
    ///
    /// Writing in order keeps the numeric suffixes, and with them the whole
    /// output, reproducible for a seeded pipeline.
    async fn finish(
        &self,
        jobs: Vec<Job>,
        output: &Path,
        start: Instant,
    ) -> PipelineResult<ProcessReport> {
        let mut rendered = stream::iter(jobs)
            .map(|job| self.render(job))
            .buffered(self.workers);

        let mut images = Vec::new();
        while let Some(item) = rendered.try_next().await? {
            images.push(self.store(item, output)?);
        }

        let report = ProcessReport {
            images,
            elapsed: start.elapsed(),
        };
        tracing::info!(
            "Wrote {} image(s) to {:?} in {:?}",
            report.written(),
            output,
            report.elapsed
        );
        Ok(report)
    }

    /// Decode one source, apply its plan and encode the result.
    async fn render(&self, job: Job) -> PipelineResult<Rendered> {
        let Job { source, plan } = job;
        self.validator.validate(&source)?;

        let bytes = tokio::fs::read(&source)
            .await
            .map_err(|e| PipelineError::io(&source, e))?;
        // Untouched images are copied verbatim rather than re-encoded.
        let original = plan.is_empty().then(|| bytes.clone());
        let decoded = self.decoder.decode_from_bytes(bytes, &source).await?;

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let base = format!("{}__{}", stem, plan.label());
        let applied = plan.applied();
        let encoder = self.encoder.clone();
        let task_source = source.clone();

        let (encoded, width, height) = tokio::task::spawn_blocking(
            move || -> PipelineResult<(EncodedImage, u32, u32)> {
                if let Some(raw) = original {
                    if let Some(encoded) = encoder.passthrough(raw, decoded.format, &task_source) {
                        return Ok((encoded, decoded.width, decoded.height));
                    }
                }
                let image = plan.apply(decoded.image);
                let encoded = encoder.encode_for(&image, decoded.format, &task_source)?;
                Ok((encoded, image.width(), image.height()))
            },
        )
        .await
        .map_err(|e| PipelineError::Encode {
            path: source.clone(),
            message: format!("Task join error: {}", e),
        })??;

        Ok(Rendered {
            source,
            base,
            applied,
            encoded,
            width,
            height,
        })
    }

    fn store(&self, rendered: Rendered, output_dir: &Path) -> PipelineResult<AugmentedImage> {
        let path = write_unique(&rendered.encoded, output_dir, &rendered.base)?;
        tracing::trace!("  {:?} -> {:?}", rendered.source, path);

        let record = AugmentedImage {
            source: rendered.source,
            output: path,
            applied: rendered.applied,
            width: rendered.width,
            height: rendered.height,
            format: format_to_string(rendered.encoded.format),
        };
        if let Some(progress) = &self.progress {
            progress(&record);
        }
        Ok(record)
    }
}

/// Reject an output directory that is the input directory.
fn ensure_distinct(input: &Path, output: &Path) -> PipelineResult<()> {
    let same = input == output
        || matches!(
            (input.canonicalize(), output.canonicalize()),
            (Ok(a), Ok(b)) if a == b
        );
    if same {
        Err(PipelineError::SameDirectory(output.to_path_buf()))
    } else {
        Ok(())
    }
}
