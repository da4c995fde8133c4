//! The `prism process` command for augmenting a directory of images.

mod batch;
mod setup;
pub mod types;

pub use types::{ImageFormat, OutputFormat};

use clap::Args;
use prism_core::{Config, ManifestFormat, Recipe, TransformStep};
use std::path::PathBuf;

use batch::run_recipe;
use setup::setup_recipe;

/// Arguments for the `process` command.
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Directory of source images
    #[arg(required = true)]
    pub input: PathBuf,

    /// Directory the augmented images are written to
    #[arg(required = true)]
    pub output: PathBuf,

    /// Recipe file with one or more [[pipeline]] tables
    #[arg(short, long, conflicts_with = "steps")]
    pub recipe: Option<PathBuf>,

    /// Step spec such as `flip_horizontal@0.5` or `zoom@1:1.05:1.2` (repeatable)
    #[arg(short = 's', long = "step", value_name = "SPEC")]
    pub steps: Vec<TransformStep>,

    /// Passes over the input for every pipeline
    #[arg(long)]
    pub runs: Option<usize>,

    /// Draw this many images (with replacement) per pass instead of each once
    #[arg(long)]
    pub sample: Option<usize>,

    /// Seed for reproducible output
    #[arg(long, env = "PRISM_SEED")]
    pub seed: Option<u64>,

    /// Number of parallel workers
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Write a manifest of every produced file
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Manifest format (defaults to output.manifest_format)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Encoding of augmented images (defaults to output.format)
    #[arg(long, value_enum)]
    pub output_format: Option<ImageFormat>,
}

/// Everything needed to run a recipe, assembled by setup_recipe().
pub(crate) struct ProcessContext {
    pub config: Config,
    pub recipe: Recipe,
    pub input: PathBuf,
    pub output: PathBuf,
    pub manifest: Option<PathBuf>,
    pub manifest_format: ManifestFormat,
    pub seed: Option<u64>,
}

/// Execute the process command with the configuration loaded at startup.
pub async fn execute(args: ProcessArgs, config: Config) -> anyhow::Result<()> {
    let ctx = setup_recipe(args, config)?;
    tracing::info!(
        "Running {} pipeline(s) over {:?}",
        ctx.recipe.pipelines.len(),
        ctx.input
    );
    run_recipe(ctx).await
}
