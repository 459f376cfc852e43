//! xlsx workbook reading and writing.

use crate::error::{Result, TransferError};
use crate::table::DataTable;
use calamine::{open_workbook_auto, Data, Reader};
use indexmap::IndexMap;
use rust_xlsxwriter::Workbook;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// Hard cap imposed by the xlsx format.
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Reads every sheet of a workbook into tables, in sheet order.
pub fn read_workbook(path: &Path) -> Result<IndexMap<String, DataTable>> {
    let mut workbook = open_workbook_auto(path).map_err(|e| {
        TransferError::SourceUnreadable(format!("{}: {e}", path.display()))
    })?;

    let sheet_names = workbook.sheet_names().to_vec();
    let mut tables = IndexMap::with_capacity(sheet_names.len());

    for sheet in sheet_names {
        let range = workbook.worksheet_range(&sheet).map_err(|e| {
            TransferError::SourceUnreadable(format!("sheet '{sheet}': {e}"))
        })?;

        let mut rows = range.rows();
        let columns: Vec<String> = match rows.next() {
            Some(header) => header
                .iter()
                .enumerate()
                .map(|(i, cell)| header_cell_name(cell, i))
                .collect(),
            None => Vec::new(),
        };

        let mut table = DataTable::new(columns);
        for row in rows {
            table
                .rows
                .push(row.iter().map(cell_to_value).collect());
        }
        tables.insert(sheet, table);
    }

    Ok(tables)
}

/// Lists sheet names without converting any cell data.
pub fn read_sheet_names(path: &Path) -> Result<Vec<String>> {
    let workbook = open_workbook_auto(path).map_err(|e| {
        TransferError::SourceUnreadable(format!("{}: {e}", path.display()))
    })?;
    Ok(workbook.sheet_names().to_vec())
}

/// Writes one sheet per table. Sheet names are truncated to the format's
/// 31-character cap and suffixed when two tables would truncate to the
/// same name; an empty table still gets its header row.
pub fn write_workbook(path: &Path, tables: &[(String, DataTable)]) -> Result<()> {
    let mut workbook = Workbook::new();
    let mut used_names = HashSet::new();

    for (name, table) in tables {
        let sheet_name = unique_sheet_name(name, &mut used_names);
        let sheet = workbook.add_worksheet();
        sheet
            .set_name(&sheet_name)
            .map_err(|e| TransferError::OutputWrite(format!("sheet '{sheet_name}': {e}")))?;

        for (col, column) in table.columns.iter().enumerate() {
            sheet
                .write_string(0, col as u16, column)
                .map_err(|e| TransferError::OutputWrite(e.to_string()))?;
        }

        for (row_index, row) in table.rows.iter().enumerate() {
            let row_number = (row_index + 1) as u32;
            for (col, value) in row.iter().enumerate() {
                let col = col as u16;
                let write_result = match value {
                    Value::Null => continue,
                    Value::Bool(v) => sheet.write_boolean(row_number, col, *v),
                    Value::Number(n) => {
                        sheet.write_number(row_number, col, n.as_f64().unwrap_or(0.0))
                    }
                    Value::String(s) => sheet.write_string(row_number, col, s),
                    other => sheet.write_string(row_number, col, other.to_string()),
                };
                write_result.map_err(|e| TransferError::OutputWrite(e.to_string()))?;
            }
        }
    }

    workbook
        .save(path)
        .map_err(|e| TransferError::OutputWrite(format!("{}: {e}", path.display())))?;
    Ok(())
}

/// Truncates to the 31-character cap, then appends `_2`, `_3`, ... when the
/// truncated name is already taken. Sheet names are case-insensitive in the
/// xlsx format, so uniqueness is tracked on the lowercased form.
fn unique_sheet_name(raw: &str, used: &mut HashSet<String>) -> String {
    let mut candidate: String = raw.chars().take(MAX_SHEET_NAME_LEN).collect();
    let mut counter = 2;
    while !used.insert(candidate.to_lowercase()) {
        let suffix = format!("_{counter}");
        let keep = MAX_SHEET_NAME_LEN - suffix.chars().count();
        candidate = raw.chars().take(keep).collect::<String>() + &suffix;
        counter += 1;
    }
    candidate
}

fn header_cell_name(cell: &Data, index: usize) -> String {
    let text = cell_text(cell);
    if text.trim().is_empty() {
        format!("column_{}", index + 1)
    } else {
        text
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        // Workbook text can carry the `_x000D_` carriage-return artifact;
        // scrub it on load.
        Data::String(s) => Value::String(s.replace("_x000D_", "")),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < (i64::MAX as f64) {
                serde_json::json!(*f as i64)
            } else {
                serde_json::json!(*f)
            }
        }
        Data::Int(i) => serde_json::json!(*i),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => Value::String(naive.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Value::Null,
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(e) => Value::String(format!("#ERR:{e:?}")),
    }
}
