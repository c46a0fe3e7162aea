//! Error types for reading and writing tables.

use thiserror::Error;

/// Errors from parsing or serializing a CSV table.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file has no header row")]
    MissingHeader,

    #[error("duplicate column '{name}' in header")]
    DuplicateColumn { name: String },

    #[error("row at line {line} has {found} fields, header has {expected}")]
    RaggedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("malformed CSV: {reason}")]
    Malformed { line: Option<u64>, reason: String },
}

impl From<csv::Error> for TableError {
    fn from(e: csv::Error) -> Self {
        match e.into_kind() {
            csv::ErrorKind::Io(err) => TableError::Io(err),
            csv::ErrorKind::UnequalLengths {
                pos,
                expected_len,
                len,
            } => TableError::RaggedRow {
                line: pos.map(|p| p.line()).unwrap_or_default(),
                expected: expected_len as usize,
                found: len as usize,
            },
            csv::ErrorKind::Utf8 { pos, err } => TableError::Malformed {
                line: pos.map(|p| p.line()),
                reason: err.to_string(),
            },
            other => TableError::Malformed {
                line: None,
                reason: format!("{other:?}"),
            },
        }
    }
}
