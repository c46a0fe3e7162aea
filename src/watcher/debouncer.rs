//! Debouncing of newly created files.
//!
//! A producer that writes a file in several chunks triggers one create event
//! followed by modify events. Holding each new path until it has been quiet
//! keeps the merger from reading a half-written file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Tracks new files until they have been stable for the configured duration.
#[derive(Debug)]
pub struct Debouncer {
    /// Pending files: path -> last event timestamp.
    pending: HashMap<PathBuf, Instant>,
    /// How long a file must be quiet before processing.
    duration: Duration,
}

impl Debouncer {
    /// Create a new debouncer with the given duration in milliseconds.
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            pending: HashMap::new(),
            duration: Duration::from_millis(debounce_ms),
        }
    }

    /// Record an event for a path, resetting its timer.
    pub fn record(&mut self, path: PathBuf) {
        self.pending.insert(path, Instant::now());
    }

    /// Reset the timer of a path only if it is already pending.
    ///
    /// Returns `false` for paths that were never recorded.
    pub fn touch(&mut self, path: &Path) -> bool {
        match self.pending.get_mut(path) {
            Some(last) => {
                *last = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Remove a path from pending (e.g., when the file is deleted).
    pub fn remove(&mut self, path: &Path) -> bool {
        self.pending.remove(path).is_some()
    }

    /// Take all paths that have been stable for the debounce duration.
    ///
    /// Oldest first; ties are ordered by path.
    pub fn take_ready(&mut self) -> Vec<PathBuf> {
        let now = Instant::now();
        let mut ready = Vec::new();

        self.pending.retain(|path, last_change| {
            if now.duration_since(*last_change) >= self.duration {
                ready.push((*last_change, path.clone()));
                false
            } else {
                true
            }
        });

        ready.sort();
        ready.into_iter().map(|(_, path)| path).collect()
    }

    /// Take every pending path regardless of age, oldest first.
    pub fn take_all(&mut self) -> Vec<PathBuf> {
        let mut all: Vec<(Instant, PathBuf)> = self
            .pending
            .drain()
            .map(|(path, last)| (last, path))
            .collect();
        all.sort();
        all.into_iter().map(|(_, path)| path).collect()
    }

    /// Check if there are any pending files.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
