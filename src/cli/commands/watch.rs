//! Long-running watch command.

use anyhow::Context;

use crate::config::Settings;
use crate::watcher::IngestWatcherBuilder;

/// Watch the configured directory until Ctrl-C.
///
/// A missing watch directory fails here, before the loop starts. If the event
/// loop exits on its own the command fails instead of idling.
pub async fn run_watch(settings: &Settings) -> anyhow::Result<()> {
    let merger = super::merger_from_settings(settings)?;

    let watcher = IngestWatcherBuilder::from_settings(settings)
        .merger(merger)
        .build()
        .with_context(|| format!("cannot watch {}", settings.watch.dir.display()))?;

    crate::log_event!("watch", "master", "{}", settings.master.path.display());
    eprintln!(
        "Watching {} for new *.{} files (Ctrl-C to stop)",
        watcher.dir().display(),
        settings.watch.extension
    );

    let mut handle = watcher.start();

    // The loop only ends on its own if it failed
    let exited = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            None
        }
        result = handle.wait() => Some(result),
    };

    match exited {
        None => {
            crate::log_event!("watch", "interrupt received");
            handle.stop().await?;
            Ok(())
        }
        Some(result) => {
            result.context("watcher stopped unexpectedly")?;
            anyhow::bail!("watcher stopped unexpectedly")
        }
    }
}
