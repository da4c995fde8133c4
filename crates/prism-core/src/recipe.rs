//! Recipes: named pipelines loaded from TOML.
//!
//! ```toml
//! [[pipeline]]
//! name = "zoom_flip"
//! runs = 2
//!
//! [[pipeline.steps]]
//! op = "zoom"
//! probability = 1.0
//! min_factor = 1.05
//! max_factor = 1.2
//!
//! [[pipeline.steps]]
//! op = "flip_horizontal"
//! probability = 1.0
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::error::{ConfigError, PipelineResult};
use crate::pipeline::Pipeline;
use crate::transform::TransformStep;
use crate::types::ProcessReport;

/// A set of pipelines run one after another over the same input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(rename = "pipeline", default)]
    pub pipelines: Vec<PipelineSpec>,
}

/// One named pipeline of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub name: String,

    /// Number of passes over the input
    #[serde(default = "default_runs")]
    pub runs: usize,

    /// Draw this many images per pass instead of processing each once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<usize>,

    #[serde(default)]
    pub steps: Vec<TransformStep>,
}

fn default_runs() -> usize {
    1
}

impl Recipe {
    /// Flip, zoom, and flip followed by zoom, each applied to every image.
    pub fn default_recipe() -> Self {
        Self {
            pipelines: vec![
                PipelineSpec::new("flip", vec![TransformStep::flip_horizontal(1.0)]),
                PipelineSpec::new("zoom", vec![TransformStep::zoom(1.0, 1.05, 1.2)]),
                PipelineSpec::new(
                    "zoom_flip",
                    vec![
                        TransformStep::flip_horizontal(1.0),
                        TransformStep::zoom(1.0, 1.05, 1.2),
                    ],
                ),
            ],
        }
    }

    /// A single-pipeline recipe built from command-line steps.
    pub fn from_steps(name: impl Into<String>, steps: Vec<TransformStep>) -> Self {
        Self {
            pipelines: vec![PipelineSpec::new(name, steps)],
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a recipe. Steps are validated while deserializing.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let recipe: Recipe = toml::from_str(content)?;
        recipe.validate()?;
        Ok(recipe)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipelines.is_empty() {
            return Err(ConfigError::ValidationError(
                "recipe defines no [[pipeline]]".into(),
            ));
        }
        let mut seen = HashSet::new();
        for spec in &self.pipelines {
            if spec.name.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "pipeline name must not be empty".into(),
                ));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate pipeline name {:?}",
                    spec.name
                )));
            }
            if spec.runs == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "pipeline {:?}: runs must be > 0",
                    spec.name
                )));
            }
            if spec.sample == Some(0) {
                return Err(ConfigError::ValidationError(format!(
                    "pipeline {:?}: sample must be > 0",
                    spec.name
                )));
            }
            for step in &spec.steps {
                step.validate()
                    .map_err(|e| ConfigError::ValidationError(format!("{}: {}", spec.name, e)))?;
            }
        }
        Ok(())
    }

    /// Total number of files the recipe writes for `inputs` source images.
    pub fn expected_outputs(&self, inputs: usize) -> usize {
        self.pipelines
            .iter()
            .map(|spec| spec.runs * spec.sample.unwrap_or(inputs))
            .sum()
    }
}

impl PipelineSpec {
    pub fn new(name: impl Into<String>, steps: Vec<TransformStep>) -> Self {
        Self {
            name: name.into(),
            runs: 1,
            sample: None,
            steps,
        }
    }

    /// Bind the steps to a pair of directories.
    ///
    /// With a seed the pipeline is reproducible; without one it draws from
    /// system entropy.
    pub fn build(
        &self,
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        config: &Config,
        seed: Option<u64>,
    ) -> PipelineResult<Pipeline> {
        let mut pipeline = match seed {
            Some(seed) => Pipeline::with_seed(input_dir, output_dir, seed)?,
            None => Pipeline::new(input_dir, output_dir)?,
        }
        .with_config(config);
        for step in &self.steps {
            pipeline.add_step(step.clone())?;
        }
        Ok(pipeline)
    }

    /// Run all passes of this spec on `pipeline` and merge their reports.
    pub async fn run<R: Rng>(&self, pipeline: &mut Pipeline<R>) -> PipelineResult<ProcessReport> {
        let mut merged = ProcessReport {
            images: Vec::new(),
            elapsed: Duration::ZERO,
        };
        for pass in 1..=self.runs {
            tracing::debug!("Pipeline {:?} pass {}/{}", self.name, pass, self.runs);
            let report = match self.sample {
                Some(count) => pipeline.sample(count).await?,
                None => pipeline.process().await?,
            };
            merged.images.extend(report.images);
            merged.elapsed += report.elapsed;
        }
        Ok(merged)
    }
}
