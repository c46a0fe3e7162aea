//! One-shot merge command.

use std::path::Path;

use anyhow::Context;

use crate::config::Settings;
use crate::merge::MergeReport;

/// Merge `file` into the configured master and print a summary.
pub fn run_merge(settings: &Settings, file: &Path) -> anyhow::Result<MergeReport> {
    let merger = super::merger_from_settings(settings)?;

    let report = merger
        .process(file)
        .with_context(|| format!("merge of {} failed", file.display()))?;

    println!(
        "Merged {} rows from {} into {} ({} rows total)",
        report.rows_added,
        report.source.display(),
        report.master.display(),
        report.rows_total
    );
    if report.created_master {
        println!("Created new master dataset");
    }
    if let Some(err) = &report.analysis_error {
        eprintln!("Warning: {err}");
    }

    Ok(report)
}
