//! One merge cycle: parse, concatenate, persist, notify.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::MasterConfig;
use crate::table::{self, Table, TableError};

use super::analysis::{Analysis, AnalysisError, SummaryAnalysis};
use super::atomic;
use super::error::MergeError;
use super::schema::{self, SchemaPolicy};

/// What to do when the master dataset does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MissingMasterPolicy {
    /// Start from an empty master whose header is the incoming file's.
    #[default]
    Create,
    /// Reject the merge.
    Fail,
}

/// Settings for a [`Merger`].
#[derive(Debug, Clone)]
pub struct MergeOptions {
    pub master_path: PathBuf,
    pub missing: MissingMasterPolicy,
    pub schema: SchemaPolicy,
    pub delimiter: u8,
}

impl MergeOptions {
    pub fn new(master_path: impl Into<PathBuf>) -> Self {
        Self {
            master_path: master_path.into(),
            missing: MissingMasterPolicy::default(),
            schema: SchemaPolicy::default(),
            delimiter: b',',
        }
    }

    /// Build options from the `[master]` settings section.
    ///
    /// Returns `None` when the configured delimiter is not a single ASCII byte.
    pub fn from_config(config: &MasterConfig) -> Option<Self> {
        Some(Self {
            master_path: config.path.clone(),
            missing: config.missing,
            schema: config.schema,
            delimiter: config.delimiter_byte()?,
        })
    }
}

/// Outcome of a successful merge cycle.
#[derive(Debug, Clone)]
pub struct MergeReport {
    pub source: PathBuf,
    pub master: PathBuf,
    pub rows_before: usize,
    pub rows_added: usize,
    pub rows_total: usize,
    pub columns: usize,
    /// The master did not exist and was created by this merge.
    pub created_master: bool,
    /// Set when the analysis hook failed after the master was persisted.
    pub analysis_error: Option<String>,
}

/// Merges incoming files into the master dataset.
pub struct Merger {
    options: MergeOptions,
    analysis: Arc<dyn Analysis>,
}

impl Merger {
    /// Create a merger that runs [`SummaryAnalysis`] after each merge.
    pub fn new(options: MergeOptions) -> Self {
        Self {
            options,
            analysis: Arc::new(SummaryAnalysis),
        }
    }

    /// Replace the analysis hook.
    pub fn with_analysis(mut self, analysis: Arc<dyn Analysis>) -> Self {
        self.analysis = analysis;
        self
    }

    pub fn master_path(&self) -> &Path {
        &self.options.master_path
    }

    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// Run one merge cycle for `new_file`.
    ///
    /// On any error before the rename the master on disk is unchanged.
    /// Analysis failures are recorded in the report, not returned.
    pub fn process(&self, new_file: &Path) -> Result<MergeReport, MergeError> {
        let delimiter = self.options.delimiter;
        let master_path = &self.options.master_path;

        let incoming = table::read_csv(new_file, delimiter)
            .map_err(|e| MergeError::from_read(new_file.to_path_buf(), e))?;

        let (master, created_master) = self.load_master(&incoming)?;
        let rows_before = master.row_count();

        let merged = schema::concat(master, &incoming, self.options.schema).map_err(|m| {
            MergeError::Schema {
                path: new_file.to_path_buf(),
                missing: m.missing,
                unexpected: m.unexpected,
            }
        })?;

        if created_master {
            if let Some(parent) = master_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| MergeError::Persist {
                    path: master_path.clone(),
                    source: TableError::Io(e),
                })?;
            }
        }

        atomic::write_atomic(master_path, &merged, delimiter).map_err(|source| {
            MergeError::Persist {
                path: master_path.clone(),
                source,
            }
        })?;

        crate::debug_event!(
            "merge",
            "persisted",
            "{} ({} rows)",
            master_path.display(),
            merged.row_count()
        );

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.analysis.analyze(&merged)))
            .unwrap_or_else(|payload| Err(AnalysisError::failed(panic_message(&*payload))));
        let analysis_error = match outcome {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(
                    hook = self.analysis.name(),
                    path = %new_file.display(),
                    "[merge] analysis hook failed: {e}"
                );
                Some(e.to_string())
            }
        };

        Ok(MergeReport {
            source: new_file.to_path_buf(),
            master: master_path.clone(),
            rows_before,
            rows_added: incoming.row_count(),
            rows_total: merged.row_count(),
            columns: merged.column_count(),
            created_master,
            analysis_error,
        })
    }

    /// Read the master, applying the missing-master policy.
    fn load_master(&self, incoming: &Table) -> Result<(Table, bool), MergeError> {
        let path = &self.options.master_path;

        match table::read_csv(path, self.options.delimiter) {
            Ok(master) => Ok((master, false)),
            Err(TableError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                match self.options.missing {
                    MissingMasterPolicy::Create => {
                        crate::log_event!("merge", "creating master", "{}", path.display());
                        let empty = Table::new(incoming.headers().to_vec())
                            .map_err(|e| MergeError::from_read(path.clone(), e))?;
                        Ok((empty, true))
                    }
                    MissingMasterPolicy::Fail => {
                        Err(MergeError::MissingMaster { path: path.clone() })
                    }
                }
            }
            Err(e) => Err(MergeError::from_read(path.clone(), e)),
        }
    }
}

/// Text of a caught panic, as passed to `panic!`.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {msg}")
    } else {
        "panicked".to_string()
    }
}
