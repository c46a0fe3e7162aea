//! Ingest watcher service: one directory, one subscription, one merge queue.

use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::merge::Merger;

use super::debouncer::Debouncer;
use super::error::WatchError;
use super::events::{EventBroadcaster, IngestEvent};
use super::filter::IngestFilter;

/// Watches one directory and merges each new file into the master.
///
/// Owns the `notify` subscription. All merges run on the event loop task one
/// after another, so two files arriving together never race on the master.
pub struct IngestWatcher {
    /// Canonical watched directory.
    dir: PathBuf,
    /// Decides which created paths are incoming files.
    filter: IngestFilter,
    /// Holds new files until their producer stops writing.
    debouncer: Debouncer,
    /// Runs merge cycles.
    merger: Merger,
    /// Outcome notifications.
    broadcaster: EventBroadcaster,
    /// Channel for receiving file events.
    event_rx: mpsc::Receiver<notify::Result<Event>>,
    /// The underlying file watcher. Dropped after `event_rx`.
    _watcher: notify::RecommendedWatcher,
    /// Event loop wake-up interval.
    tick: Duration,
}

impl IngestWatcher {
    /// Create a builder for configuring the watcher.
    pub fn builder() -> IngestWatcherBuilder {
        IngestWatcherBuilder::new()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn broadcaster(&self) -> &EventBroadcaster {
        &self.broadcaster
    }

    /// Spawn the event loop on the current Tokio runtime.
    pub fn start(self) -> WatcherHandle {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(cancel.clone()));
        WatcherHandle { cancel, task }
    }

    /// Run the event loop until `cancel` fires.
    ///
    /// 1. Receives file events from notify
    /// 2. Queues created files in the debouncer
    /// 3. Merges files that have been quiet for the debounce period
    /// 4. On cancel, merges whatever is still queued and returns
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), WatchError> {
        crate::log_event!(
            "watcher",
            "started",
            "{} (*.{})",
            self.dir.display(),
            self.filter.extension()
        );

        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let result = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break Ok(()),

                res = self.event_rx.recv() => {
                    match res {
                        Some(Ok(event)) => self.handle_event(event),
                        Some(Err(e)) => {
                            tracing::error!("[watcher] file watch error: {e}");
                        }
                        None => break Err(WatchError::ChannelClosed),
                    }
                }

                _ = ticker.tick() => {
                    for path in self.debouncer.take_ready() {
                        self.dispatch(&path);
                    }
                }
            }
        };

        self.drain();
        result
    }

    /// Route one notify event.
    fn handle_event(&mut self, event: Event) {
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                for path in event.paths {
                    self.on_created(path);
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                // paths = [from, to]
                let mut paths = event.paths.into_iter();
                if let Some(from) = paths.next() {
                    self.on_removed(&from);
                }
                for to in paths {
                    self.on_created(to);
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) | EventKind::Remove(_) => {
                for path in &event.paths {
                    self.on_removed(path);
                }
            }
            EventKind::Modify(_) => {
                for path in &event.paths {
                    if self.debouncer.touch(path) {
                        crate::debug_event!("watcher", "still writing", "{}", path.display());
                    }
                }
            }
            _ => {}
        }
    }

    fn on_created(&mut self, path: PathBuf) {
        if self.filter.matches(&path) {
            crate::debug_event!("watcher", "queued", "{}", path.display());
            self.debouncer.record(path);
        } else {
            crate::debug_event!("watcher", "unmatched", "{}", path.display());
            self.broadcaster.send(IngestEvent::Ignored { path });
        }
    }

    fn on_removed(&mut self, path: &Path) {
        if self.debouncer.remove(path) {
            crate::debug_event!("watcher", "removed before merge", "{}", path.display());
        }
    }

    /// Run one merge cycle. Failures are logged and broadcast, never raised.
    fn dispatch(&self, path: &Path) {
        if !path.is_file() {
            crate::debug_event!("watcher", "vanished", "{}", path.display());
            return;
        }

        crate::log_event!("watcher", "new file", "{}", path.display());

        match self.merger.process(path) {
            Ok(report) => {
                crate::log_event!(
                    "merge",
                    "merged",
                    "{} (+{} rows, {} total)",
                    path.display(),
                    report.rows_added,
                    report.rows_total
                );
                self.broadcaster.send(IngestEvent::Merged {
                    path: path.to_path_buf(),
                    rows_added: report.rows_added,
                    rows_total: report.rows_total,
                });
            }
            Err(e) => {
                tracing::error!(
                    kind = e.kind(),
                    path = %path.display(),
                    "[merge] skipped file: {e}"
                );
                self.broadcaster.send(IngestEvent::Failed {
                    path: path.to_path_buf(),
                    kind: e.kind(),
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Consume buffered events and merge everything still queued.
    fn drain(&mut self) {
        while let Ok(res) = self.event_rx.try_recv() {
            if let Ok(event) = res {
                self.handle_event(event);
            }
        }

        for path in self.debouncer.take_ready() {
            self.dispatch(&path);
        }

        // Still inside the quiet window; the producer may not be done
        let unsettled = self.debouncer.take_all();
        if !unsettled.is_empty() {
            crate::log_event!("watcher", "flushing", "{} queued files", unsettled.len());
        }
        for path in unsettled {
            tracing::warn!(
                path = %path.display(),
                "[watcher] flushed before quiet, file may be incomplete"
            );
            self.dispatch(&path);
        }

        crate::log_event!("watcher", "stopped");
    }
}

/// Handle to a running [`IngestWatcher`].
pub struct WatcherHandle {
    cancel: CancellationToken,
    task: JoinHandle<Result<(), WatchError>>,
}

impl WatcherHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the subscription and wait for the loop to exit.
    ///
    /// A merge in progress completes first; queued files are flushed.
    pub async fn stop(mut self) -> Result<(), WatchError> {
        self.cancel.cancel();
        self.wait().await
    }

    /// Wait for the loop to exit without cancelling it.
    ///
    /// Cancel safe. Must not be polled again once it has returned.
    pub async fn wait(&mut self) -> Result<(), WatchError> {
        (&mut self.task).await.map_err(|e| WatchError::EventError {
            details: format!("watcher task failed: {e}"),
        })?
    }
}

/// Builder for constructing an IngestWatcher.
pub struct IngestWatcherBuilder {
    dir: Option<PathBuf>,
    extension: String,
    debounce_ms: u64,
    tick_ms: u64,
    merger: Option<Merger>,
    broadcaster: Option<EventBroadcaster>,
}

impl IngestWatcherBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            dir: None,
            extension: "csv".to_string(),
            debounce_ms: 500,
            tick_ms: 100,
            merger: None,
            broadcaster: None,
        }
    }

    /// Take directory, extension and timings from the `[watch]` section.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new()
            .dir(settings.watch.dir.clone())
            .extension(&settings.watch.extension)
            .debounce_ms(settings.watch.debounce_ms)
            .tick_ms(settings.watch.tick_ms)
    }

    /// Set the directory to watch.
    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Set the extension of incoming files (without the dot).
    pub fn extension(mut self, extension: &str) -> Self {
        self.extension = extension.to_string();
        self
    }

    /// Set the debounce duration in milliseconds.
    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Set the event loop wake-up interval in milliseconds.
    pub fn tick_ms(mut self, ms: u64) -> Self {
        self.tick_ms = ms;
        self
    }

    /// Set the merger.
    pub fn merger(mut self, merger: Merger) -> Self {
        self.merger = Some(merger);
        self
    }

    /// Set the event broadcaster.
    pub fn broadcaster(mut self, broadcaster: EventBroadcaster) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    /// Build the IngestWatcher and subscribe to its directory.
    ///
    /// Fails if the directory does not exist; events start buffering as soon
    /// as this returns.
    pub fn build(self) -> Result<IngestWatcher, WatchError> {
        let dir = self.dir.ok_or_else(|| WatchError::InitFailed {
            reason: "Watch directory is required".to_string(),
        })?;

        let merger = self.merger.ok_or_else(|| WatchError::InitFailed {
            reason: "Merger is required".to_string(),
        })?;

        if !dir.is_dir() {
            return Err(WatchError::PathWatchFailed {
                path: dir,
                reason: "not an existing directory".to_string(),
            });
        }
        let dir = dir
            .canonicalize()
            .map_err(|e| WatchError::PathWatchFailed {
                path: dir.clone(),
                reason: e.to_string(),
            })?;

        let filter = IngestFilter::new(&self.extension).exclude(merger.master_path());

        // Create channel for events
        let (tx, rx) = mpsc::channel(100);

        // Create the notify watcher
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        })?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: dir.clone(),
                reason: e.to_string(),
            })?;
        crate::debug_event!("watcher", "watching", "{}", dir.display());

        Ok(IngestWatcher {
            dir,
            filter,
            debouncer: Debouncer::new(self.debounce_ms),
            merger,
            broadcaster: self.broadcaster.unwrap_or_default(),
            event_rx: rx,
            _watcher: watcher,
            tick: Duration::from_millis(self.tick_ms.max(1)),
        })
    }
}

impl Default for IngestWatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
