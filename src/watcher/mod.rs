//! Directory watcher that feeds new files to the merger.
//!
//! # Architecture
//!
//! ```text
//! notify::RecommendedWatcher (NonRecursive)
//!         | mpsc
//!   IngestWatcher event loop
//!     - IngestFilter (extension, hidden files, master)
//!     - Debouncer (wait for producer to finish writing)
//!     - Merger::process, one file at a time
//!         |
//!   EventBroadcaster -> IngestEvent subscribers
//! ```

mod debouncer;
mod error;
mod events;
mod filter;
mod service;

pub use debouncer::Debouncer;
pub use error::WatchError;
pub use events::{EventBroadcaster, IngestEvent};
pub use filter::IngestFilter;
pub use service::{IngestWatcher, IngestWatcherBuilder, WatcherHandle};
