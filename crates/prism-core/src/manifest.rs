//! Manifests describing what a run wrote, as JSON or JSON Lines.
//!
//! A JSON manifest is a single array of [`AugmentedImage`] records; a JSONL
//! manifest holds one record per line and can be appended to across runs.

use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::types::AugmentedImage;

/// Manifest format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// Single JSON array
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl ManifestFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Serializes manifest records to a writer.
pub struct ManifestWriter<W: Write> {
    writer: W,
    format: ManifestFormat,
    pretty: bool,
    records_written: usize,
}

impl<W: Write> ManifestWriter<W> {
    /// Create a new manifest writer. `pretty` only affects the JSON format.
    pub fn new(writer: W, format: ManifestFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            records_written: 0,
        }
    }

    /// Write one record as its own JSON line.
    ///
    /// Only meaningful for JSONL; JSON manifests go through [`Self::write_all`].
    pub fn write_line<T: Serialize>(&mut self, record: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record).map_err(io::Error::other)?;
        writeln!(self.writer)?;
        self.records_written += 1;
        Ok(())
    }

    /// Write a batch of records in the configured format.
    pub fn write_all<T: Serialize>(&mut self, records: &[T]) -> io::Result<()> {
        match self.format {
            ManifestFormat::Json => {
                if self.pretty {
                    serde_json::to_writer_pretty(&mut self.writer, records)
                        .map_err(io::Error::other)?;
                } else {
                    serde_json::to_writer(&mut self.writer, records).map_err(io::Error::other)?;
                }
                writeln!(self.writer)?;
                self.records_written += records.len();
            }
            ManifestFormat::JsonLines => {
                for record in records {
                    self.write_line(record)?;
                }
            }
        }
        Ok(())
    }

    /// Get the number of records written.
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Write `records` to a manifest file.
///
/// JSONL manifests are appended to, so repeated runs accumulate. JSON
/// manifests are rewritten as one array.
pub fn write_manifest(
    path: &Path,
    records: &[AugmentedImage],
    format: ManifestFormat,
) -> io::Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = match format {
        ManifestFormat::Json => File::create(path)?,
        ManifestFormat::JsonLines => OpenOptions::new().create(true).append(true).open(path)?,
    };
    let mut writer = ManifestWriter::new(BufWriter::new(file), format, true);
    writer.write_all(records)?;
    writer.flush()?;
    Ok(writer.records_written())
}
