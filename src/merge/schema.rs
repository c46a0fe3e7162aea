//! Column alignment policies for concatenating an incoming table onto the master.

use serde::{Deserialize, Serialize};

use crate::table::Table;

/// Value written into cells of columns a row did not provide.
pub const EMPTY_MARKER: &str = "";

/// How to treat an incoming file whose columns differ from the master's.
///
/// Columns are always matched by name. Incoming columns are reordered to the
/// master's order, so producers may emit columns in any order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SchemaPolicy {
    /// Column sets must be identical.
    #[default]
    Strict,
    /// Missing columns are filled with [`EMPTY_MARKER`]; extra columns are rejected.
    Align,
    /// Extra columns are appended to the master and backfilled with [`EMPTY_MARKER`].
    Union,
}

/// Columns that differ between the master and an incoming table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaMismatch {
    /// In the master but absent from the incoming file.
    pub missing: Vec<String>,
    /// In the incoming file but absent from the master.
    pub unexpected: Vec<String>,
}

impl SchemaMismatch {
    pub fn between(master: &[String], incoming: &[String]) -> Self {
        Self {
            missing: master
                .iter()
                .filter(|c| !incoming.contains(c))
                .cloned()
                .collect(),
            unexpected: incoming
                .iter()
                .filter(|c| !master.contains(c))
                .cloned()
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

/// Append the rows of `incoming` to `master`.
///
/// Master rows keep their positions; incoming rows follow in file order.
pub fn concat(
    mut master: Table,
    incoming: &Table,
    policy: SchemaPolicy,
) -> Result<Table, SchemaMismatch> {
    let mismatch = SchemaMismatch::between(master.headers(), incoming.headers());

    match policy {
        SchemaPolicy::Strict if !mismatch.is_empty() => return Err(mismatch),
        SchemaPolicy::Align if !mismatch.unexpected.is_empty() => return Err(mismatch),
        SchemaPolicy::Union => {
            for name in &mismatch.unexpected {
                if master.add_column(name, EMPTY_MARKER).is_err() {
                    return Err(mismatch.clone());
                }
            }
        }
        _ => {}
    }

    let mapping: Vec<Option<usize>> = master
        .headers()
        .iter()
        .map(|name| incoming.column_index(name))
        .collect();

    for row in incoming.rows() {
        let aligned = mapping
            .iter()
            .map(|idx| match idx {
                Some(i) => row[*i].clone(),
                None => EMPTY_MARKER.to_string(),
            })
            .collect();
        if master.push_row(aligned).is_err() {
            return Err(mismatch);
        }
    }

    Ok(master)
}
