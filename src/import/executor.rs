//! Write execution.
//!
//! One call per target table: normalize and trim the incoming columns,
//! run the collation guard, resolve the effective write action, load the
//! rows, and report what happened. Mode resolution is a pure function so
//! the one non-obvious policy (replace with exclusions truncates instead
//! of dropping) stays independently testable.

use crate::backend::DbPool;
use crate::error::{Result, TransferError};
use crate::import::collation::{self, CollationChoice, CollationStatus};
use crate::import::models::{
    TableDescriptor, TableWriteReport, WriteAction, WriteMode, WriteOptions,
};
use crate::import::normalizer::normalize;
use crate::table::{infer_table_schema, DataTable};
use std::collections::BTreeSet;

/// Resolves the write path from mode, table existence, and whether the
/// operator excluded any fields. Replace on an existing table normally
/// drops and recreates it; with exclusions it must not, because dropping
/// would also discard destination columns the operator never asked to
/// remove, so the schema is kept and the rows are cleared instead.
pub fn resolve_write_action(
    mode: WriteMode,
    table_exists: bool,
    has_exclusions: bool,
) -> WriteAction {
    match (mode, table_exists, has_exclusions) {
        (_, false, _) => WriteAction::CreateInsert,
        (WriteMode::Replace, true, false) => WriteAction::DropRecreateInsert,
        (WriteMode::Replace, true, true) => WriteAction::TruncateInsert,
        (WriteMode::Append, true, _) => WriteAction::AppendInsert,
    }
}

/// Writes one table. The collation guard runs before any row is touched;
/// a `CollationMismatch` therefore leaves the destination unchanged.
pub async fn write_table(
    backend: &DbPool,
    table: &str,
    data: &DataTable,
    opts: &WriteOptions,
) -> Result<TableWriteReport> {
    let table = normalize(table);
    let excluded: BTreeSet<String> = opts.excluded_fields.iter().map(|f| normalize(f)).collect();

    let (data, dropped_columns) = prepare_columns(data, &excluded);

    let descriptor = backend.describe_table(&table).await?;
    let table_exists = descriptor.is_some();

    if let Some(descriptor) = &descriptor {
        collation_guard(descriptor, opts)?;
    }

    let action = resolve_write_action(opts.mode, table_exists, !excluded.is_empty());
    log::info!(
        "writing {} row(s) into '{}' via {:?}",
        data.row_count(),
        table,
        action
    );

    let rows_written = match action {
        WriteAction::CreateInsert => {
            let schema = infer_table_schema(&data)?;
            backend.create_table(&table, &schema).await?;
            backend.insert_rows(&table, &data, false).await?
        }
        WriteAction::DropRecreateInsert => {
            let schema = infer_table_schema(&data)?;
            backend.drop_table(&table).await?;
            backend.create_table(&table, &schema).await?;
            backend.insert_rows(&table, &data, false).await?
        }
        WriteAction::TruncateInsert => {
            backend.truncate_table(&table).await?;
            backend.insert_rows(&table, &data, true).await?
        }
        WriteAction::AppendInsert => backend.insert_rows(&table, &data, true).await?,
    };

    if let Some(requested) = opts.desired_collation.as_deref() {
        if action.replaces_schema() {
            backend.apply_collation(&table, requested).await?;
        }
    }

    Ok(TableWriteReport {
        table,
        rows_written,
        dropped_columns,
        action,
    })
}

/// Fails with `CollationMismatch` when the operator requested a collation,
/// asked to stop on mismatch, and the existing table (or any of its text
/// columns) reports a different one. Unknown collations never trip the
/// guard.
fn collation_guard(descriptor: &TableDescriptor, opts: &WriteOptions) -> Result<()> {
    let Some(requested) = opts.desired_collation.as_deref() else {
        return Ok(());
    };
    if !opts.stop_on_mismatch {
        return Ok(());
    }

    let effective = collation::resolve(&CollationChoice::Explicit(requested.to_string()), None);
    let table_status = collation::compare(descriptor.collation.as_deref(), &effective);
    let column_mismatches = collation::mismatched_columns(descriptor, &effective);

    if table_status == CollationStatus::Mismatch || !column_mismatches.is_empty() {
        let mut actual = descriptor
            .collation
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        if !column_mismatches.is_empty() {
            actual = format!("{actual} (columns: {})", column_mismatches.join(", "));
        }
        return Err(TransferError::CollationMismatch {
            table: descriptor.name.clone(),
            actual,
            requested: requested.to_string(),
        });
    }
    Ok(())
}

/// Normalizes every column name, then drops the excluded ones. Returns
/// the trimmed table and the dropped names for the report.
fn prepare_columns(data: &DataTable, excluded: &BTreeSet<String>) -> (DataTable, Vec<String>) {
    let normalized_columns: Vec<String> = data.columns.iter().map(|c| normalize(c)).collect();

    let drop_indexes: Vec<usize> = normalized_columns
        .iter()
        .enumerate()
        .filter(|(_, name)| excluded.contains(*name))
        .map(|(i, _)| i)
        .collect();
    let dropped: Vec<String> = drop_indexes
        .iter()
        .map(|&i| normalized_columns[i].clone())
        .collect();

    let mut trimmed = DataTable {
        columns: normalized_columns,
        rows: data.rows.clone(),
    };
    if !drop_indexes.is_empty() {
        trimmed = trimmed.without_columns(&drop_indexes);
    }

    (trimmed, dropped)
}
