//! Source datasets and their logical units.
//!
//! A source is either one rectangular table or a keyed collection of them
//! (multi-sheet workbook, dictionary-shaped collection file). The shape is
//! resolved once at load time into a tagged variant, then cached for the
//! rest of the reconciliation session.

use crate::error::{Result, TransferError};
use crate::import::normalizer::normalize;
use crate::table::DataTable;
use crate::{collection, workbook};
use indexmap::IndexMap;
use std::path::Path;

#[derive(Debug, Clone)]
pub enum SourceData {
    SingleTable(DataTable),
    KeyedCollection(IndexMap<String, DataTable>),
}

/// A loaded source with its dataset name (the file stem, used as the
/// fallback table name for a lone single-table source).
#[derive(Debug, Clone)]
pub struct SourceDataset {
    pub name: String,
    pub data: SourceData,
}

impl SourceDataset {
    /// Loads a source file, dispatching on extension: `.xlsx`/`.xls` is a
    /// workbook, anything else a collection file.
    pub fn load(path: &Path) -> Result<SourceDataset> {
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "import".to_string());

        let is_workbook = path
            .extension()
            .map(|ext| {
                let ext = ext.to_string_lossy().to_ascii_lowercase();
                ext == "xlsx" || ext == "xls"
            })
            .unwrap_or(false);

        let data = if is_workbook {
            SourceData::KeyedCollection(workbook::read_workbook(path)?)
        } else {
            collection::read_collection(path)?
        };

        Ok(SourceDataset { name, data })
    }

    /// Unit names in file-declared order; empty for a single-table source
    /// (the caller then treats the whole source as the one unit).
    pub fn unit_names(&self) -> Vec<String> {
        match &self.data {
            SourceData::SingleTable(_) => Vec::new(),
            SourceData::KeyedCollection(tables) => tables.keys().cloned().collect(),
        }
    }

    /// Normalized field names of the given unit, in source-declared order.
    pub fn peek_fields(&self, unit: Option<&str>) -> Result<Vec<String>> {
        Ok(self
            .table_for_unit(unit)?
            .columns
            .iter()
            .map(|c| normalize(c))
            .collect())
    }

    /// Resolves a unit name to its table. `None` addresses a single-table
    /// source directly, or the first unit of a keyed collection (the
    /// "first sheet" default).
    pub fn table_for_unit(&self, unit: Option<&str>) -> Result<&DataTable> {
        match (&self.data, unit) {
            (SourceData::SingleTable(table), None) => Ok(table),
            (SourceData::SingleTable(_), Some(unit)) => Err(TransferError::UnitNotFound {
                unit: unit.to_string(),
                available: Vec::new(),
            }),
            (SourceData::KeyedCollection(tables), None) => {
                tables.values().next().ok_or_else(|| {
                    TransferError::SourceUnreadable("source contains no units".to_string())
                })
            }
            (SourceData::KeyedCollection(tables), Some(unit)) => {
                tables.get(unit).ok_or_else(|| TransferError::UnitNotFound {
                    unit: unit.to_string(),
                    available: tables.keys().cloned().collect(),
                })
            }
        }
    }

    /// Every importable `(unit, table)` pair in declared order. A lone
    /// table is labeled with the dataset name.
    pub fn units(&self) -> Vec<(Option<String>, &DataTable)> {
        match &self.data {
            SourceData::SingleTable(table) => vec![(None, table)],
            SourceData::KeyedCollection(tables) => tables
                .iter()
                .map(|(name, table)| (Some(name.clone()), table))
                .collect(),
        }
    }

    /// The target table name a unit maps to when deriving from unit names.
    pub fn derived_table_name(&self, unit: Option<&str>) -> String {
        match unit {
            Some(unit) => normalize(unit),
            None => normalize(&self.name),
        }
    }
}

#[cfg(test)]
mod tests;
