//! CSV reading and writing for [`Table`].

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use super::{Table, TableError};

/// Read a CSV file with a header row.
pub fn read_csv(path: &Path, delimiter: u8) -> Result<Table, TableError> {
    let file = File::open(path)?;
    read_from(BufReader::new(file), delimiter)
}

/// Read CSV from any reader. The first record is the header.
///
/// Fails on empty input, ragged rows, invalid UTF-8 and duplicate column names.
pub fn read_from<R: Read>(reader: R, delimiter: u8) -> Result<Table, TableError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() {
        return Err(TableError::MissingHeader);
    }

    let mut table = Table::new(headers)?;
    for record in rdr.records() {
        let record = record?;
        table.push_row(record.iter().map(str::to_string).collect())?;
    }

    Ok(table)
}

/// Write a table as CSV (header first, `\n` terminators) and return the writer.
pub fn write_to<W: Write>(table: &Table, writer: W, delimiter: u8) -> Result<W, TableError> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    wtr.write_record(table.headers())?;
    for row in table.rows() {
        wtr.write_record(row)?;
    }
    wtr.flush()?;

    wtr.into_inner()
        .map_err(|e| TableError::Io(e.into_error()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_basic() {
        let table = read_from("id,qty\n1,10\n2,20\n".as_bytes(), b',').unwrap();
        assert_eq!(table.headers(), &["id".to_string(), "qty".to_string()]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows()[1], vec!["2".to_string(), "20".to_string()]);
    }

    #[test]
    fn test_read_header_only() {
        let table = read_from("id,qty\n".as_bytes(), b',').unwrap();
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn test_read_empty_input_has_no_header() {
        let err = read_from("".as_bytes(), b',').unwrap_err();
        assert!(matches!(err, TableError::MissingHeader));
    }

    #[test]
    fn test_read_ragged_row() {
        let err = read_from("id,qty\n1,10\n2\n".as_bytes(), b',').unwrap_err();
        match err {
            TableError::RaggedRow {
                line,
                expected,
                found,
            } => {
                assert_eq!(line, 3);
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("expected RaggedRow, got {other:?}"),
        }
    }

    #[test]
    fn test_read_duplicate_header() {
        let err = read_from("id,id\n1,2\n".as_bytes(), b',').unwrap_err();
        assert!(matches!(err, TableError::DuplicateColumn { .. }));
    }

    #[test]
    fn test_read_invalid_utf8() {
        let bytes: &[u8] = b"id,name\n1,\xff\xfe\n";
        let err = read_from(bytes, b',').unwrap_err();
        assert!(matches!(err, TableError::Malformed { .. }));
    }

    #[test]
    fn test_write_quotes_embedded_delimiters() {
        let table = Table::with_rows(
            vec!["id".to_string(), "note".to_string()],
            vec![vec!["1".to_string(), "late, partial\nshipment".to_string()]],
        )
        .unwrap();

        let out = write_to(&table, Vec::new(), b',').unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "id,note\n1,\"late, partial\nshipment\"\n");

        let back = read_from(text.as_bytes(), b',').unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_semicolon_delimiter() {
        let table = read_from("id;qty\n1;10\n".as_bytes(), b';').unwrap();
        assert_eq!(table.rows()[0], vec!["1".to_string(), "10".to_string()]);
    }
}
