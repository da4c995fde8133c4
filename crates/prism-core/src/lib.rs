//! Prism Core - Embeddable image augmentation library.
//!
//! Prism grows image training sets: it runs ordered lists of probabilistic
//! transformations over a directory of source images and writes every
//! result as a new file, leaving the sources untouched.
//!
//! # Architecture
//!
//! ```text
//! Discover → Validate → Decode → Plan (draw) → Apply steps → Encode → Write
//! ```
//!
//! Randomness is drawn per image into a [`Plan`] before any pixel work, so a
//! seeded pipeline produces the same files whatever the worker count.
//!
//! # Usage
//!
//! ```rust,ignore
//! use prism_core::{Pipeline, TransformStep};
//!
//! #[tokio::main]
//! async fn main() -> prism_core::PipelineResult<()> {
//!     let mut pipeline = Pipeline::new("./trainset/1", "./trainset/1_aug")?;
//!     pipeline.add_step(TransformStep::zoom(1.0, 1.05, 1.2))?;
//!     pipeline.add_step(TransformStep::flip_horizontal(0.5))?;
//!
//!     let report = pipeline.process().await?;
//!     println!("Wrote {} images", report.written());
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod manifest;
pub mod pipeline;
pub mod recipe;
pub mod transform;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::{ConfigError, PipelineError, PipelineResult};
pub use manifest::{write_manifest, ManifestFormat, ManifestWriter};
pub use pipeline::Pipeline;
pub use recipe::{PipelineSpec, Recipe};
pub use transform::{Plan, Transform, TransformStep};
pub use types::{AugmentedImage, ProcessReport};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
