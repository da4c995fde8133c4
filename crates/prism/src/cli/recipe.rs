//! The `prism recipe` command for inspecting and checking recipe files.

use clap::{Args, Subcommand};
use prism_core::Recipe;
use std::path::PathBuf;

/// Arguments for the `recipe` command.
#[derive(Args, Debug)]
pub struct RecipeArgs {
    #[command(subcommand)]
    pub command: RecipeCommand,
}

/// Subcommands for recipe management.
#[derive(Subcommand, Debug)]
pub enum RecipeCommand {
    /// Print a recipe as TOML (the built-in one when no file is given)
    Show {
        /// Recipe file
        file: Option<PathBuf>,
    },

    /// Validate a recipe file and list its pipelines
    Check {
        /// Recipe file
        file: PathBuf,
    },
}

/// Execute the recipe command.
pub async fn execute(args: RecipeArgs) -> anyhow::Result<()> {
    match args.command {
        RecipeCommand::Show { file } => {
            let recipe = match file {
                Some(path) => Recipe::load(&path)?,
                None => Recipe::default_recipe(),
            };
            println!("{}", recipe.to_toml()?);
        }

        RecipeCommand::Check { file } => {
            let recipe = Recipe::load(&file)
                .map_err(|e| anyhow::anyhow!("{}: {e}", file.display()))?;
            println!("{}", describe(&recipe));
        }
    }

    Ok(())
}

/// One line per pipeline: name, passes, sampling and step specs.
fn describe(recipe: &Recipe) -> String {
    recipe
        .pipelines
        .iter()
        .map(|spec| {
            let steps: Vec<String> = spec.steps.iter().map(ToString::to_string).collect();
            let mode = match spec.sample {
                Some(n) => format!("sample {n}"),
                None => "each image".to_string(),
            };
            format!(
                "{}: {} run(s), {}, steps [{}]",
                spec.name,
                spec.runs,
                mode,
                steps.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_default_recipe() {
        let text = describe(&Recipe::default_recipe());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "flip: 1 run(s), each image, steps [flip_horizontal@1]");
        assert!(lines[2].starts_with("zoom_flip:"));
    }

    #[tokio::test]
    async fn test_check_reports_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[[pipeline]]\nname = \"x\"\nruns = 0\n").unwrap();

        let err = execute(RecipeArgs {
            command: RecipeCommand::Check { file: path },
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("runs must be > 0"));
    }
}
