//! Merging incoming CSV files into the master dataset.
//!
//! # Merge cycle
//!
//! ```text
//! incoming.csv --parse--+
//!                       +--concat (SchemaPolicy)--> temp file --rename--> master.csv
//! master.csv ---parse---+                                                    |
//!                                                                     Analysis hook
//! ```
//!
//! The master is replaced by a single rename, so a failed cycle leaves the
//! previous master on disk. Merging the same file twice appends its rows twice.

pub mod analysis;
pub mod atomic;
mod error;
mod merger;
pub mod schema;

pub use analysis::{Analysis, AnalysisError, FnAnalysis, SummaryAnalysis};
pub use error::MergeError;
pub use merger::{MergeOptions, MergeReport, Merger, MissingMasterPolicy};
pub use schema::{EMPTY_MARKER, SchemaMismatch, SchemaPolicy};
