//! Prism CLI - Probabilistic image augmentation for training-set preparation.
//!
//! Prism reads a directory of images, runs them through one or more pipelines
//! of randomly applied transformations (flips, rotations, zoom, hue shift,
//! grid distortion) and writes every result as a new file. Source images are
//! never modified.
//!
//! # Usage
//!
//! ```bash
//! # Built-in recipe: flip, zoom, flip+zoom for every image
//! prism process ./trainset/1 ./trainset/1_aug
//!
//! # Ad-hoc steps, three passes, reproducible
//! prism process ./in ./out --step flip_horizontal@0.5 --step zoom@1:1.05:1.2 --runs 3 --seed 7
//!
//! # Recipe file with a manifest of what was written
//! prism process ./in ./out --recipe distort.toml --manifest out/manifest.jsonl -f jsonl
//!
//! # View configuration
//! prism config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Prism - Probabilistic image augmentation for training-set preparation.
#[derive(Parser, Debug)]
#[command(name = "prism")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Augment a directory of images
    Process(cli::process::ProcessArgs),

    /// Inspect and validate recipe files
    Recipe(cli::recipe::RecipeArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match prism_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `prism config path`."
            );
            prism_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Prism v{}", prism_core::VERSION);

    match cli.command {
        Commands::Process(args) => cli::process::execute(args, config).await,
        Commands::Recipe(args) => cli::recipe::execute(args).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
