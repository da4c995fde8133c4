//! Error types for the Prism augmentation pipeline.
//!
//! Errors are organized by concern to provide clear, actionable messages
//! that include relevant context (file paths, step names, specific issues).

use std::path::PathBuf;
use thiserror::Error;

/// Configuration and recipe errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A path was missing, unreadable or unwritable
    #[error("IO error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A step parameter is out of range or malformed
    #[error("Invalid parameter for {step}: {message}")]
    InvalidParameter { step: String, message: String },

    /// The file is not an image this pipeline can decode
    #[error("Unsupported format for {path}: {format} ({reason})")]
    UnsupportedFormat {
        path: PathBuf,
        format: String,
        reason: String,
    },

    /// The decode task itself failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Image encoding failed
    #[error("Encode error for {path}: {message}")]
    Encode { path: PathBuf, message: String },

    /// Operation timed out
    #[error("Timeout in {stage} stage for {path} after {timeout_ms}ms")]
    Timeout {
        path: PathBuf,
        stage: String,
        timeout_ms: u64,
    },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Sampling needs at least one source image
    #[error("No supported images found in {0}")]
    NoImages(PathBuf),

    /// Output directory resolves to the input directory
    #[error("Output directory must differ from input directory: {0}")]
    SameDirectory(PathBuf),
}

impl PipelineError {
    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Build an `InvalidParameter` error for the named step.
    pub fn invalid(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            step: step.into(),
            message: message.into(),
        }
    }
}

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_message() {
        let err = PipelineError::invalid("flip_horizontal", "probability 1.5 not in [0, 1]");
        assert_eq!(
            err.to_string(),
            "Invalid parameter for flip_horizontal: probability 1.5 not in [0, 1]"
        );
    }

    #[test]
    fn test_io_error_keeps_path() {
        let err = PipelineError::io(
            "/missing/dir",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory"),
        );
        assert!(err.to_string().contains("/missing/dir"));
        assert!(matches!(err, PipelineError::Io { .. }));
    }

    #[test]
    fn test_unsupported_format_carries_reason() {
        let err = PipelineError::UnsupportedFormat {
            path: PathBuf::from("a.png"),
            format: "png".to_string(),
            reason: "unexpected end of file".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unsupported format for a.png: png (unexpected end of file)"
        );
    }
}
