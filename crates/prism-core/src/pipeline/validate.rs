//! Source validation before decoding.

use std::io::Read;
use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Validates source files before they are decoded.
#[derive(Debug, Clone)]
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Perform quick validation before full decode.
    ///
    /// Checks:
    /// - File exists and is readable
    /// - File size is within limits
    /// - File starts with a known image signature
    pub fn validate(&self, path: &Path) -> Result<(), PipelineError> {
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }

        let metadata = std::fs::metadata(path).map_err(|e| PipelineError::io(path, e))?;

        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        if metadata.len() > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: metadata.len() / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        self.check_signature(path)
    }

    fn check_signature(&self, path: &Path) -> Result<(), PipelineError> {
        let mut file = std::fs::File::open(path).map_err(|e| PipelineError::io(path, e))?;

        let mut header = [0u8; 12];
        let bytes_read = file
            .read(&mut header)
            .map_err(|e| PipelineError::io(path, e))?;

        if Self::sniff(&header[..bytes_read]).is_none() {
            return Err(PipelineError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
                reason: "unrecognized file signature".to_string(),
            });
        }
        Ok(())
    }

    /// Name the image format whose signature `header` starts with.
    fn sniff(header: &[u8]) -> Option<&'static str> {
        match header {
            [0xFF, 0xD8, 0xFF, ..] => Some("jpeg"),
            [0x89, b'P', b'N', b'G', ..] => Some("png"),
            [b'G', b'I', b'F', b'8', ..] => Some("gif"),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("webp"),
            [b'B', b'M', _, _, ..] => Some("bmp"),
            [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => Some("tiff"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_jpeg() {
        let header = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(Validator::sniff(&header), Some("jpeg"));
    }

    #[test]
    fn test_signature_png() {
        let header = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
        assert_eq!(Validator::sniff(&header), Some("png"));
    }

    #[test]
    fn test_signature_webp_needs_full_header() {
        let header = [b'R', b'I', b'F', b'F', 0, 0, 0, 0, b'W', b'E', b'B', b'P'];
        assert_eq!(Validator::sniff(&header), Some("webp"));
        assert_eq!(Validator::sniff(&header[..4]), None);
    }

    #[test]
    fn test_signature_tiff_both_byte_orders() {
        assert_eq!(Validator::sniff(&[b'I', b'I', 0x2A, 0x00]), Some("tiff"));
        assert_eq!(Validator::sniff(&[b'M', b'M', 0x00, 0x2A]), Some("tiff"));
        assert_eq!(Validator::sniff(&[b'I', b'I', 0x00, 0x00]), None);
    }

    #[test]
    fn test_signature_short_or_unknown() {
        assert_eq!(Validator::sniff(&[]), None);
        assert_eq!(Validator::sniff(&[0xFF, 0xD8]), None);
        assert_eq!(Validator::sniff(b"hello world!"), None);
    }

    #[test]
    fn test_validate_missing_file() {
        let validator = Validator::new(LimitsConfig::default());
        let err = validator.validate(Path::new("/no/such/image.png")).unwrap_err();
        assert!(matches!(err, PipelineError::FileNotFound(_)));
    }

    #[test]
    fn test_validate_text_file_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.png");
        std::fs::write(&path, "definitely not an image").unwrap();

        let validator = Validator::new(LimitsConfig::default());
        let err = validator.validate(&path).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFormat { .. }));
    }
}
