//! Core data types produced by the augmentation pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// One augmented file written by a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugmentedImage {
    /// Source image the output was derived from
    pub source: PathBuf,

    /// Path of the written file
    pub output: PathBuf,

    /// Names of the steps that fired, in application order
    pub applied: Vec<String>,

    /// Output width in pixels
    pub width: u32,

    /// Output height in pixels
    pub height: u32,

    /// Encoded format ("jpeg", "png", ...)
    pub format: String,
}

/// Result of one `process()` or `sample()` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessReport {
    /// Written files in processing order
    pub images: Vec<AugmentedImage>,

    /// Wall-clock time of the call
    #[serde(with = "millis")]
    pub elapsed: Duration,
}

impl ProcessReport {
    /// Number of files written.
    pub fn written(&self) -> usize {
        self.images.len()
    }

    /// Throughput of the call in images per second.
    pub fn images_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.images.len() as f64 / secs
        } else {
            0.0
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> AugmentedImage {
        AugmentedImage {
            source: PathBuf::from("/data/trainset/1/cat.jpg"),
            output: PathBuf::from("/data/trainset/1_aug/cat__flip_horizontal__001.jpg"),
            applied: vec!["flip_horizontal".to_string()],
            width: 640,
            height: 480,
            format: "jpeg".to_string(),
        }
    }

    #[test]
    fn test_record_serializes_applied_steps() {
        let json = serde_json::to_string(&sample_record()).unwrap();
        assert!(json.contains("\"applied\":[\"flip_horizontal\"]"));
        assert!(json.contains("\"format\":\"jpeg\""));
    }

    #[test]
    fn test_report_elapsed_in_millis() {
        let report = ProcessReport {
            images: vec![sample_record()],
            elapsed: Duration::from_millis(1500),
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"elapsed\":1500"));

        let back: ProcessReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.elapsed, Duration::from_millis(1500));
        assert_eq!(back.written(), 1);
    }

    #[test]
    fn test_images_per_second() {
        let report = ProcessReport {
            images: vec![sample_record(), sample_record()],
            elapsed: Duration::from_secs(4),
        };
        assert!((report.images_per_second() - 0.5).abs() < f64::EPSILON);
        assert_eq!(ProcessReport::default().images_per_second(), 0.0);
    }
}
