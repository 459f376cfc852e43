//! Serialized collection files.
//!
//! A collection file is a JSON document tagged by `kind`: either one table
//! (`columns` + `rows`) or a named collection of tables. Table order inside
//! a collection is the file-declared order and survives a round trip.

use crate::error::{Result, TransferError};
use crate::source::SourceData;
use crate::table::DataTable;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum CollectionFile {
    Table {
        columns: Vec<String>,
        rows: Vec<Vec<serde_json::Value>>,
    },
    Collection {
        tables: IndexMap<String, DataTable>,
    },
}

/// Reads a collection file into source data, preserving declared order.
pub fn read_collection(path: &Path) -> Result<SourceData> {
    let file = File::open(path).map_err(|e| {
        TransferError::SourceUnreadable(format!("{}: {e}", path.display()))
    })?;
    let parsed: CollectionFile = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        TransferError::SourceUnreadable(format!("{}: {e}", path.display()))
    })?;

    Ok(match parsed {
        CollectionFile::Table { columns, rows } => {
            SourceData::SingleTable(DataTable { columns, rows })
        }
        CollectionFile::Collection { tables } => SourceData::KeyedCollection(tables),
    })
}

/// Writes one table as a single-table collection file.
pub fn write_single(path: &Path, table: &DataTable) -> Result<()> {
    write_file(
        path,
        &CollectionFile::Table {
            columns: table.columns.clone(),
            rows: table.rows.clone(),
        },
    )
}

/// Writes a keyed collection, one entry per table, in the given order.
pub fn write_collection(path: &Path, tables: &IndexMap<String, DataTable>) -> Result<()> {
    write_file(
        path,
        &CollectionFile::Collection {
            tables: tables.clone(),
        },
    )
}

fn write_file(path: &Path, contents: &CollectionFile) -> Result<()> {
    let file = File::create(path).map_err(|e| {
        TransferError::OutputWrite(format!("{}: {e}", path.display()))
    })?;
    serde_json::to_writer_pretty(BufWriter::new(file), contents).map_err(|e| {
        TransferError::OutputWrite(format!("{}: {e}", path.display()))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests;
