//! File discovery for finding source images in a directory.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ProcessingConfig;
use crate::error::{PipelineError, PipelineResult};

/// Discovers image files in directories.
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    config: ProcessingConfig,
}

/// Information about a discovered file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl FileDiscovery {
    /// Create a new file discovery instance.
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    /// Discover all supported image files in `dir`, sorted by path.
    ///
    /// Only the top level is scanned unless `processing.recursive` is set.
    /// Anything under `exclude` (the output directory) is skipped so that
    /// augmented files never feed back into a later run.
    pub fn discover(
        &self,
        dir: &Path,
        exclude: Option<&Path>,
    ) -> PipelineResult<Vec<DiscoveredFile>> {
        let meta = std::fs::metadata(dir).map_err(|e| PipelineError::io(dir, e))?;
        if !meta.is_dir() {
            return Err(PipelineError::io(
                dir,
                std::io::Error::other("input path is not a directory"),
            ));
        }

        let max_depth = if self.config.recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(dir)
            .follow_links(true)
            .max_depth(max_depth)
            .into_iter()
            .filter_entry(|e| exclude.map_or(true, |ex| !e.path().starts_with(ex)));

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                PipelineError::io(path, e.into())
            })?;
            let entry_path = entry.path();
            if entry.file_type().is_file() && self.is_supported(entry_path) {
                let meta = entry
                    .metadata()
                    .map_err(|e| PipelineError::io(entry_path, e.into()))?;
                files.push(DiscoveredFile {
                    path: entry_path.to_path_buf(),
                    size: meta.len(),
                });
            }
        }

        // Sort by path for deterministic ordering
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    /// Check if a file has a supported extension.
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.config
                    .supported_formats
                    .iter()
                    .any(|fmt| fmt.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    /// Get total size of all discovered files.
    pub fn total_size(files: &[DiscoveredFile]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}
