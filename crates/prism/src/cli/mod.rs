//! Command handlers for the `prism` binary.

pub mod config;
pub mod process;
pub mod recipe;
