//! Image augmentation pipeline components.
//!
//! This module contains the stages every source image goes through:
//! - **discovery**: Find image files in a directory
//! - **validate**: Pre-processing checks (existence, size, magic bytes)
//! - **decode**: Load and decode images with a timeout
//! - **encode**: Encode augmented images and write them without clobbering
//! - **processor**: The `Pipeline` tying steps, randomness and I/O together

pub mod decode;
pub mod discovery;
pub mod encode;
pub mod processor;
pub mod validate;

// Re-exports for convenient access
pub use decode::{DecodedImage, ImageDecoder};
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use encode::{write_unique, EncodedImage, ImageEncoder};
pub use processor::{Pipeline, ProgressFn};
pub use validate::Validator;
