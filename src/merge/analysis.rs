//! Analysis hooks run after a merge has been persisted.

use thiserror::Error;

use crate::table::Table;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("analysis failed: {reason}")]
    Failed { reason: String },
}

impl AnalysisError {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

/// Side-effecting logic invoked with the merged dataset.
///
/// Errors are reported by the merger but never undo the master write.
pub trait Analysis: Send + Sync {
    /// Hook name for logging.
    fn name(&self) -> &str;

    fn analyze(&self, table: &Table) -> Result<(), AnalysisError>;
}

/// Adapts a closure into an [`Analysis`].
pub struct FnAnalysis<F> {
    name: String,
    f: F,
}

impl<F> FnAnalysis<F>
where
    F: Fn(&Table) -> Result<(), AnalysisError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Analysis for FnAnalysis<F>
where
    F: Fn(&Table) -> Result<(), AnalysisError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn analyze(&self, table: &Table) -> Result<(), AnalysisError> {
        (self.f)(table)
    }
}

/// Default hook: logs row and column counts plus per-column fill.
#[derive(Debug, Default, Clone, Copy)]
pub struct SummaryAnalysis;

impl SummaryAnalysis {
    /// Number of non-empty values per column, in header order.
    pub fn filled_counts(table: &Table) -> Vec<(String, usize)> {
        table
            .headers()
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let filled = table
                    .rows()
                    .iter()
                    .filter(|row| !row[idx].trim().is_empty())
                    .count();
                (name.clone(), filled)
            })
            .collect()
    }
}

impl Analysis for SummaryAnalysis {
    fn name(&self) -> &str {
        "summary"
    }

    fn analyze(&self, table: &Table) -> Result<(), AnalysisError> {
        crate::log_event!(
            "analysis",
            "dataset updated",
            "{} rows, {} columns",
            table.row_count(),
            table.column_count()
        );
        for (column, filled) in Self::filled_counts(table) {
            crate::debug_event!("analysis", "column", "{column}: {filled} filled");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled_counts() {
        let table = Table::with_rows(
            vec!["id".to_string(), "site".to_string()],
            vec![
                vec!["1".to_string(), "north".to_string()],
                vec!["2".to_string(), " ".to_string()],
            ],
        )
        .unwrap();

        let counts = SummaryAnalysis::filled_counts(&table);
        assert_eq!(
            counts,
            vec![("id".to_string(), 2), ("site".to_string(), 1)]
        );
        assert!(SummaryAnalysis.analyze(&table).is_ok());
    }

    #[test]
    fn test_fn_analysis_forwards() {
        let hook = FnAnalysis::new("reject", |_table: &Table| {
            Err(AnalysisError::failed("no model"))
        });
        let table = Table::new(vec!["id".to_string()]).unwrap();

        assert_eq!(hook.name(), "reject");
        let err = hook.analyze(&table).unwrap_err();
        assert_eq!(err.to_string(), "analysis failed: no model");
    }
}
