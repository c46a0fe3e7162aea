//! Broadcast of ingest outcomes.
//!
//! Lets callers (tests, embedding services) observe each merge cycle without
//! parsing logs.

use std::path::PathBuf;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestEvent {
    /// A file was merged into the master.
    Merged {
        path: PathBuf,
        rows_added: usize,
        rows_total: usize,
    },
    /// A merge cycle failed; `kind` is [`crate::merge::MergeError::kind`].
    Failed {
        path: PathBuf,
        kind: &'static str,
        reason: String,
    },
    /// A created path did not qualify as an incoming file.
    Ignored { path: PathBuf },
}

/// Fan-out channel for [`IngestEvent`]s.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<IngestEvent>,
}

impl EventBroadcaster {
    /// Create a new broadcaster with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Send an event to all subscribers
    pub fn send(&self, event: IngestEvent) {
        match self.sender.send(event.clone()) {
            Ok(count) => {
                crate::debug_event!("broadcast", "sent", "{event:?} to {count} subscribers");
            }
            Err(_) => {
                // No receivers, this is fine
                crate::debug_event!("broadcast", "dropped", "no subscribers for {event:?}");
            }
        }
    }

    /// Subscribe to receive events
    pub fn subscribe(&self) -> broadcast::Receiver<IngestEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(64)
    }
}
