//! Atomic replacement of the master file.
//!
//! The merged table is written to a hidden temporary file next to the target,
//! synced, and renamed over it. An existing target's permissions carry over
//! to the replacement. Dropping a [`StagedWrite`] without committing
//! removes the temporary file and leaves the target untouched.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::table::{self, Table, TableError};

/// Prefix of temporary files created beside the master.
pub const TEMP_PREFIX: &str = ".ingestor-";

/// A fully written temporary file waiting to replace its target.
#[derive(Debug)]
pub struct StagedWrite {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedWrite {
    /// Write `table` to a temporary file in the target's directory.
    pub fn stage(target: &Path, table: &Table, delimiter: u8) -> Result<Self, TableError> {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".tmp")
            .tempfile_in(dir)?;

        table::write_to(table, temp.as_file_mut(), delimiter)?;

        // Temp files are created owner-only
        match fs::metadata(target) {
            Ok(meta) => temp.as_file().set_permissions(meta.permissions())?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        temp.as_file().sync_all()?;

        Ok(Self {
            temp,
            target: target.to_path_buf(),
        })
    }

    /// Path of the temporary file.
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Rename the temporary file over the target.
    pub fn commit(self) -> Result<(), TableError> {
        self.temp
            .persist(&self.target)
            .map(|_| ())
            .map_err(|e| TableError::Io(e.error))
    }
}

/// Replace `target` with `table` in one rename.
pub fn write_atomic(target: &Path, table: &Table, delimiter: u8) -> Result<(), TableError> {
    StagedWrite::stage(target, table, delimiter)?.commit()
}
