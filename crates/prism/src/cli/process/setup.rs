//! Recipe setup: config overrides and recipe resolution.

use prism_core::{Config, ManifestFormat, Recipe};
use std::path::{Path, PathBuf};

use super::{ProcessArgs, ProcessContext};

/// Validate paths, apply CLI overrides to `config` and resolve the recipe to run.
pub fn setup_recipe(args: ProcessArgs, mut config: Config) -> anyhow::Result<ProcessContext> {
    let input = expand(&args.input);
    let output = expand(&args.output);

    if !input.is_dir() {
        anyhow::bail!(
            "Input directory does not exist: {:?}\n\n  Hint: Pass a directory of images, not a single file.",
            input
        );
    }

    apply_overrides(&mut config, &args)?;
    let manifest_format = match args.format {
        Some(format) => ManifestFormat::from(format),
        None => ManifestFormat::parse(&config.output.manifest_format)
            .unwrap_or(ManifestFormat::Json),
    };

    let mut recipe = resolve_recipe(&args)?;
    for spec in &mut recipe.pipelines {
        if let Some(runs) = args.runs {
            spec.runs = runs;
        }
        if args.sample.is_some() {
            spec.sample = args.sample;
        }
    }
    recipe.validate()?;

    Ok(ProcessContext {
        config,
        recipe,
        input,
        output,
        manifest: args.manifest.as_deref().map(expand),
        manifest_format,
        seed: args.seed,
    })
}

/// CLI flags win over the config file.
fn apply_overrides(config: &mut Config, args: &ProcessArgs) -> anyhow::Result<()> {
    if let Some(parallel) = args.parallel {
        if parallel == 0 {
            anyhow::bail!("--parallel must be at least 1");
        }
        config.processing.parallel_workers = parallel;
    }
    if let Some(format) = args.output_format {
        config.output.format = format.to_string();
    }
    Ok(())
}

/// `--recipe` file, else `--step` specs, else the built-in recipe.
fn resolve_recipe(args: &ProcessArgs) -> anyhow::Result<Recipe> {
    if let Some(path) = &args.recipe {
        let path = expand(path);
        return Recipe::load(&path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to load recipe {:?}: {e}\n\n  Hint: Check it with `prism recipe check`.",
                path
            )
        });
    }
    if !args.steps.is_empty() {
        return Ok(Recipe::from_steps("cli", args.steps.clone()));
    }
    tracing::debug!("No recipe or steps given, using the built-in recipe");
    Ok(Recipe::default_recipe())
}

fn expand(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}
