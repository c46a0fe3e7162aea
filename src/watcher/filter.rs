//! Decides which created paths are incoming files.

use std::path::{Path, PathBuf};

/// Matches files with the ingest extension, excluding hidden files and the
/// master dataset itself.
#[derive(Debug, Clone)]
pub struct IngestFilter {
    /// Extension without the leading dot.
    extension: String,
    /// Paths never treated as incoming files (compared after normalization).
    excluded: Vec<PathBuf>,
}

impl IngestFilter {
    pub fn new(extension: &str) -> Self {
        Self {
            extension: extension.trim_start_matches('.').to_string(),
            excluded: Vec::new(),
        }
    }

    /// Never match `path`.
    pub fn exclude(mut self, path: &Path) -> Self {
        self.excluded.push(normalize(path));
        self
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Check if a created path should be merged.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if name.starts_with('.') {
            return false;
        }

        let has_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension));
        if !has_extension {
            return false;
        }

        if self.excluded.is_empty() {
            return true;
        }
        let normalized = normalize(path);
        !self.excluded.iter().any(|p| *p == normalized)
    }
}

/// Absolute form of `path` with its parent canonicalized when possible.
///
/// The file itself may not exist yet (a master that will be created later).
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    match (absolute.parent(), absolute.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map(|p| p.join(name))
            .unwrap_or(absolute),
        _ => absolute,
    }
}
