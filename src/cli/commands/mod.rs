//! Command implementations for the CLI.
//!
//! Each command is implemented in its own module.

pub mod init;
pub mod merge;
pub mod watch;

use anyhow::anyhow;

use crate::config::Settings;
use crate::merge::{MergeOptions, Merger};

/// Build the merger described by the `[master]` settings.
pub(crate) fn merger_from_settings(settings: &Settings) -> anyhow::Result<Merger> {
    let options = MergeOptions::from_config(&settings.master).ok_or_else(|| {
        anyhow!(
            "master.delimiter must be a single ASCII character, got {:?}",
            settings.master.delimiter
        )
    })?;
    Ok(Merger::new(options))
}
