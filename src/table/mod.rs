//! In-memory tabular data and its CSV codec.
//!
//! A [`Table`] is a header row plus text rows. Values are never type-inferred,
//! so whatever a producer wrote is what ends up in the master file.

mod csv_io;
mod error;

pub use csv_io::{read_csv, read_from, write_to};
pub use error::TableError;

use std::collections::HashSet;

/// A header row and the rows aligned to it.
///
/// Every row holds exactly `headers.len()` values and column names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Create an empty table with the given header.
    pub fn new(headers: Vec<String>) -> Result<Self, TableError> {
        if headers.is_empty() {
            return Err(TableError::MissingHeader);
        }

        let mut seen = HashSet::with_capacity(headers.len());
        for name in &headers {
            if !seen.insert(name.as_str()) {
                return Err(TableError::DuplicateColumn { name: name.clone() });
            }
        }

        Ok(Self {
            headers,
            rows: Vec::new(),
        })
    }

    /// Create a table from a header and rows, checking every row's width.
    pub fn with_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, TableError> {
        let mut table = Self::new(headers)?;
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Iterate over the values of one column.
    pub fn column<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a str> + use<'a>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row[idx].as_str()))
    }

    /// Append a row. Its width must match the header.
    pub fn push_row(&mut self, row: Vec<String>) -> Result<(), TableError> {
        if row.len() != self.headers.len() {
            return Err(TableError::RaggedRow {
                line: self.rows.len() as u64 + 2,
                expected: self.headers.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Append a new column, filling existing rows with `fill`.
    pub fn add_column(&mut self, name: &str, fill: &str) -> Result<(), TableError> {
        if self.column_index(name).is_some() {
            return Err(TableError::DuplicateColumn {
                name: name.to_string(),
            });
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(fill.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_new_rejects_duplicate_columns() {
        let err = Table::new(strings(&["id", "qty", "id"])).unwrap_err();
        assert!(matches!(err, TableError::DuplicateColumn { ref name } if name == "id"));
    }

    #[test]
    fn test_new_rejects_empty_header() {
        assert!(matches!(
            Table::new(Vec::new()),
            Err(TableError::MissingHeader)
        ));
    }

    #[test]
    fn test_push_row_checks_width() {
        let mut table = Table::new(strings(&["id", "qty"])).unwrap();
        table.push_row(strings(&["1", "10"])).unwrap();

        let err = table.push_row(strings(&["2"])).unwrap_err();
        assert!(matches!(
            err,
            TableError::RaggedRow {
                expected: 2,
                found: 1,
                ..
            }
        ));
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_add_column_backfills() {
        let mut table =
            Table::with_rows(strings(&["id"]), vec![strings(&["1"]), strings(&["2"])]).unwrap();
        table.add_column("site", "").unwrap();

        assert_eq!(table.headers(), &strings(&["id", "site"])[..]);
        let site: Vec<&str> = table.column("site").unwrap().collect();
        assert_eq!(site, vec!["", ""]);
        assert!(table.add_column("id", "").is_err());
    }
}
