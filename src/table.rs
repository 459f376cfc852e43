use crate::error::{Result, TransferError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One rectangular table: an ordered column list plus rows of JSON values.
/// Every conversion direction moves `DataTable`s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl DataTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns a copy without the columns at the given indexes.
    pub fn without_columns(&self, drop_indexes: &[usize]) -> DataTable {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|i| !drop_indexes.contains(i))
            .collect();
        DataTable {
            columns: keep.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| {
                    keep.iter()
                        .map(|&i| row.get(i).cloned().unwrap_or(Value::Null))
                        .collect()
                })
                .collect(),
        }
    }
}

/// Destination column type inferred from source values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Float,
    Boolean,
    Text,
}

/// Infers the destination type for one column by scanning its values.
///
/// Nulls are ignored. Integers widen to Float when mixed with floats; any
/// other mix (string with number, bool with anything else, nested JSON)
/// cannot be mapped and fails per column. A column with no non-null values
/// falls back to Text.
pub fn infer_column_type(column: &str, values: impl Iterator<Item = Value>) -> Result<SqlType> {
    let mut inferred: Option<SqlType> = None;

    for value in values {
        let kind = match &value {
            Value::Null => continue,
            Value::Bool(_) => SqlType::Boolean,
            Value::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    SqlType::Integer
                } else {
                    SqlType::Float
                }
            }
            Value::String(_) => SqlType::Text,
            other => {
                return Err(TransferError::SchemaInferenceAmbiguous {
                    column: column.to_string(),
                    detail: format!("nested value {} has no table representation", other),
                })
            }
        };

        inferred = Some(match (inferred, kind) {
            (None, kind) => kind,
            (Some(current), kind) if current == kind => current,
            (Some(SqlType::Integer), SqlType::Float) | (Some(SqlType::Float), SqlType::Integer) => {
                SqlType::Float
            }
            (Some(current), kind) => {
                return Err(TransferError::SchemaInferenceAmbiguous {
                    column: column.to_string(),
                    detail: format!("values mix {:?} and {:?}", current, kind),
                })
            }
        });
    }

    Ok(inferred.unwrap_or(SqlType::Text))
}

/// Infers a `(column, type)` schema for every column of the table.
pub fn infer_table_schema(table: &DataTable) -> Result<Vec<(String, SqlType)>> {
    table
        .columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let values = table
                .rows
                .iter()
                .map(move |row| row.get(index).cloned().unwrap_or(Value::Null));
            infer_column_type(column, values).map(|t| (column.clone(), t))
        })
        .collect()
}

#[cfg(test)]
mod tests;
