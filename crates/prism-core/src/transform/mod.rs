//! Probabilistic image transformations.
//!
//! - **step**: `TransformStep` definitions, validation and step-spec parsing
//! - **plan**: resolving steps into concrete operations and applying them
//! - **distortion**: grid-based random distortion

pub mod distortion;
pub mod plan;
pub mod step;

pub use distortion::DistortionGrid;
pub use plan::{Operation, Plan};
pub use step::{Transform, TransformStep};
