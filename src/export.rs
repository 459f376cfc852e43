//! Export extraction: database to workbook or collection file.
//!
//! The read-direction mirror of the import pipeline. A scope names what
//! to pull (one table, one query, or every table); the result is the
//! same `SourceData` shape imports consume, so the file codecs are
//! shared between both directions.

use crate::backend::DbPool;
use crate::error::{Result, TransferError};
use crate::source::SourceData;
use crate::{collection, workbook};
use indexmap::IndexMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportScope {
    Table(String),
    /// Operator-supplied SQL, executed as a single prepared statement and
    /// never interpolated into other text.
    Query(String),
    Database,
}

impl ExportScope {
    /// Default output file stem, matching what operators expect to find
    /// on disk: the table name, `query_result`, or `<db>_full`.
    pub fn default_file_stem(&self, database: &str) -> String {
        match self {
            ExportScope::Table(table) => table.clone(),
            ExportScope::Query(_) => "query_result".to_string(),
            ExportScope::Database => format!("{database}_full"),
        }
    }
}

/// Pulls the scoped data out of the backend. A whole-database export of
/// an empty database fails rather than producing an empty file.
pub async fn extract(backend: &DbPool, scope: &ExportScope) -> Result<SourceData> {
    match scope {
        ExportScope::Table(table) => {
            let data = backend.fetch_table(table).await?;
            Ok(SourceData::SingleTable(data))
        }
        ExportScope::Query(sql) => {
            let data = backend.run_query(sql).await?;
            Ok(SourceData::SingleTable(data))
        }
        ExportScope::Database => {
            let tables = backend.list_tables().await?;
            if tables.is_empty() {
                return Err(TransferError::ValidationError(
                    "database contains no tables to export".to_string(),
                ));
            }
            let mut collected = IndexMap::with_capacity(tables.len());
            for table in tables {
                let data = backend.fetch_table(&table).await?;
                log::info!("exported '{}' ({} row(s))", table, data.row_count());
                collected.insert(table, data);
            }
            Ok(SourceData::KeyedCollection(collected))
        }
    }
}

/// Writes extracted data to `path`, choosing the codec by extension:
/// `.xlsx`/`.xls` is a workbook, anything else a collection file. A lone
/// table becomes one sheet named after `name`.
pub fn write_dataset(path: &Path, name: &str, data: &SourceData) -> Result<()> {
    let is_workbook = path
        .extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_ascii_lowercase();
            ext == "xlsx" || ext == "xls"
        })
        .unwrap_or(false);

    match (is_workbook, data) {
        (true, SourceData::SingleTable(table)) => {
            workbook::write_workbook(path, &[(name.to_string(), table.clone())])
        }
        (true, SourceData::KeyedCollection(tables)) => {
            let sheets: Vec<(String, crate::table::DataTable)> = tables
                .iter()
                .map(|(table, data)| (table.clone(), data.clone()))
                .collect();
            workbook::write_workbook(path, &sheets)
        }
        (false, SourceData::SingleTable(table)) => collection::write_single(path, table),
        (false, SourceData::KeyedCollection(tables)) => collection::write_collection(path, tables),
    }
}

#[cfg(test)]
mod tests;
