//! Directory-watching CSV ingestion.
//!
//! New files dropped into a watched directory are appended to a master CSV
//! dataset, one merge at a time, and an analysis hook runs after each merge.

pub mod cli;
pub mod config;
pub mod logging;
pub mod merge;
pub mod table;
pub mod watcher;

pub use config::Settings;
pub use merge::{
    Analysis, AnalysisError, FnAnalysis, MergeError, MergeOptions, MergeReport, Merger,
    MissingMasterPolicy, SchemaPolicy,
};
pub use table::{Table, TableError};
pub use watcher::{EventBroadcaster, IngestEvent, IngestWatcher, WatchError, WatcherHandle};
