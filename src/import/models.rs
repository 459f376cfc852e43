use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One destination column as reported by the target database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: String,
    /// Key role, e.g. "PRI" for primary-key members.
    pub column_key: String,
    /// Extra attribute flags, e.g. "auto_increment".
    pub extra: String,
    pub collation: Option<String>,
}

impl ColumnDescriptor {
    pub fn is_auto_increment(&self) -> bool {
        self.extra.to_ascii_lowercase().contains("auto_increment")
    }
}

/// Snapshot of an existing destination table. Fetched on demand and never
/// cached across planner invocations, because schemas can change between
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub collation: Option<String>,
}

impl TableDescriptor {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    Replace,
    #[default]
    Append,
}

/// Classification of one field across source and destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldStatus {
    Both,
    SourceOnly,
    DestinationOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldEntry {
    pub name: String,
    pub status: FieldStatus,
}

/// Per-target-table reconciliation result: the normalized source field
/// list, the destination schema snapshot (absent for a first-time import),
/// and the three-way field classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub target_table: String,
    /// Unit the data comes from; `None` for a lone single-table source.
    pub source_unit: Option<String>,
    /// Normalized field names in source-declared order.
    pub source_fields: Vec<String>,
    pub descriptor: Option<TableDescriptor>,
    pub field_status: Vec<FieldEntry>,
    /// Identity columns pre-excluded by default; the operator may
    /// re-include them.
    pub auto_excluded: BTreeSet<String>,
}

impl ComparisonRecord {
    pub fn fields_with_status(&self, status: FieldStatus) -> Vec<&str> {
        self.field_status
            .iter()
            .filter(|entry| entry.status == status)
            .map(|entry| entry.name.as_str())
            .collect()
    }
}

/// Which target tables an import addresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSelection {
    /// One explicit target table, optionally fed from one named unit.
    Single {
        unit: Option<String>,
        table: String,
    },
    /// Every unit, each becoming a target table via name normalization.
    AllUnits,
}

/// Finalized parameters for one table write.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    pub mode: WriteMode,
    pub excluded_fields: BTreeSet<String>,
    pub desired_collation: Option<String>,
    pub stop_on_mismatch: bool,
}

/// What the executor reports back per table, for operator display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableWriteReport {
    pub table: String,
    pub rows_written: u64,
    pub dropped_columns: Vec<String>,
    pub action: WriteAction,
}

/// The effective write path chosen by mode resolution. Replace with
/// exclusions keeps the schema and truncates instead of dropping, so
/// destination-only columns survive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteAction {
    /// Table absent: create it from the incoming data, then insert.
    CreateInsert,
    /// Replace without exclusions: drop, recreate from incoming data, insert.
    DropRecreateInsert,
    /// Replace with exclusions: schema-preserving truncate, then insert.
    TruncateInsert,
    /// Append into an existing table with duplicate-tolerant inserts.
    AppendInsert,
}

impl WriteAction {
    /// Whether the action created or fully replaced the table, which is
    /// when a requested collation conversion applies after the load.
    pub fn replaces_schema(&self) -> bool {
        matches!(self, WriteAction::CreateInsert | WriteAction::DropRecreateInsert)
    }
}
