//! Error types for merge cycles.

use std::path::PathBuf;
use thiserror::Error;

use crate::table::TableError;

/// Errors from one merge cycle. None of them leave a partially written master.
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: TableError,
    },

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("master dataset {path} does not exist")]
    MissingMaster { path: PathBuf },

    #[error("columns of {path} do not match master (missing: [{}], unexpected: [{}])", .missing.join(", "), .unexpected.join(", "))]
    Schema {
        path: PathBuf,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("failed to write master dataset {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: TableError,
    },
}

impl MergeError {
    /// Short stable label for logs and events.
    pub fn kind(&self) -> &'static str {
        match self {
            MergeError::Parse { .. } => "parse",
            MergeError::Io { .. } => "io",
            MergeError::MissingMaster { .. } => "missing_master",
            MergeError::Schema { .. } => "schema",
            MergeError::Persist { .. } => "persist",
        }
    }

    /// Classify a table read failure for `path`.
    pub(crate) fn from_read(path: PathBuf, err: TableError) -> Self {
        match err {
            TableError::Io(source) => MergeError::Io { path, source },
            source => MergeError::Parse { path, source },
        }
    }
}
