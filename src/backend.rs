//! Backend dispatch and shared SQL plumbing.
//!
//! `DbPool` wraps the two supported engines behind one surface so the
//! planner, executor, and export extractor stay backend-agnostic. Bulk
//! inserts are rendered as batched literal statements with local escaping.

use crate::error::{Result, TransferError};
use crate::import::models::TableDescriptor;
use crate::table::{DataTable, SqlType};
use crate::{mysql, sqlite};
use serde_json::Value;
use sqlx::mysql::MySqlRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{MySql, Pool, Row, Sqlite};

const INSERT_BATCH_SIZE: usize = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    MySql,
    Sqlite,
}

/// A connection to one target database, owned by a single session.
pub enum DbPool {
    MySql(Pool<MySql>),
    Sqlite(Pool<Sqlite>),
}

impl DbPool {
    pub fn kind(&self) -> BackendKind {
        match self {
            DbPool::MySql(_) => BackendKind::MySql,
            DbPool::Sqlite(_) => BackendKind::Sqlite,
        }
    }

    pub async fn list_tables(&self) -> Result<Vec<String>> {
        match self {
            DbPool::MySql(pool) => mysql::list_tables(pool).await,
            DbPool::Sqlite(pool) => sqlite::list_tables(pool).await,
        }
    }

    pub async fn describe_table(&self, table: &str) -> Result<Option<TableDescriptor>> {
        match self {
            DbPool::MySql(pool) => mysql::describe_table(pool, table).await,
            DbPool::Sqlite(pool) => sqlite::describe_table(pool, table).await,
        }
    }

    /// Schema default collation; `None` means unknown. SQLite carries no
    /// collation metadata, so it is always unknown there.
    pub async fn default_collation(&self) -> Option<String> {
        match self {
            DbPool::MySql(pool) => mysql::default_collation(pool).await,
            DbPool::Sqlite(_) => None,
        }
    }

    pub async fn fetch_table(&self, table: &str) -> Result<DataTable> {
        match self {
            DbPool::MySql(pool) => mysql::fetch_table(pool, table).await,
            DbPool::Sqlite(pool) => sqlite::fetch_table(pool, table).await,
        }
    }

    pub async fn run_query(&self, sql: &str) -> Result<DataTable> {
        match self {
            DbPool::MySql(pool) => mysql::run_query(pool, sql).await,
            DbPool::Sqlite(pool) => sqlite::run_query(pool, sql).await,
        }
    }

    pub async fn create_table(&self, table: &str, schema: &[(String, SqlType)]) -> Result<()> {
        let sql = match self.kind() {
            BackendKind::MySql => mysql::create_table_sql(table, schema),
            BackendKind::Sqlite => sqlite::create_table_sql(table, schema),
        };
        self.execute(&sql, table).await.map(|_| ())
    }

    pub async fn drop_table(&self, table: &str) -> Result<()> {
        let sql = format!("DROP TABLE {}", self.quote_ident(table));
        self.execute(&sql, table).await.map(|_| ())
    }

    /// Clears all rows without touching column definitions.
    pub async fn truncate_table(&self, table: &str) -> Result<()> {
        let sql = format!("DELETE FROM {}", self.quote_ident(table));
        self.execute(&sql, table).await.map(|_| ())
    }

    /// Bulk-inserts all rows in batches. With `ignore_duplicates`, rows
    /// whose key already exists are skipped, not erroneous; the returned
    /// count reflects rows actually written.
    pub async fn insert_rows(
        &self,
        table: &str,
        data: &DataTable,
        ignore_duplicates: bool,
    ) -> Result<u64> {
        if data.columns.is_empty() || data.rows.is_empty() {
            return Ok(0);
        }

        let verb = match (self.kind(), ignore_duplicates) {
            (_, false) => "INSERT",
            (BackendKind::MySql, true) => "INSERT IGNORE",
            (BackendKind::Sqlite, true) => "INSERT OR IGNORE",
        };
        let quoted_columns = data
            .columns
            .iter()
            .map(|c| self.quote_ident(c))
            .collect::<Vec<String>>()
            .join(", ");

        let mut written = 0u64;
        for batch in data.rows.chunks(INSERT_BATCH_SIZE) {
            let values = batch
                .iter()
                .map(|row| {
                    let literals = (0..data.columns.len())
                        .map(|i| {
                            value_to_sql_literal(self.kind(), row.get(i).unwrap_or(&Value::Null))
                        })
                        .collect::<Vec<String>>()
                        .join(", ");
                    format!("({literals})")
                })
                .collect::<Vec<String>>()
                .join(", ");

            let statement = format!(
                "{verb} INTO {} ({quoted_columns}) VALUES {values}",
                self.quote_ident(table)
            );
            written += self.execute(&statement, table).await?;
        }

        Ok(written)
    }

    pub async fn apply_collation(&self, table: &str, collation: &str) -> Result<()> {
        match self {
            DbPool::MySql(pool) => mysql::apply_collation(pool, table, collation).await,
            DbPool::Sqlite(_) => {
                log::debug!("collation conversion skipped for SQLite table '{table}'");
                Ok(())
            }
        }
    }

    pub async fn execute(&self, sql: &str, table: &str) -> Result<u64> {
        match self {
            DbPool::MySql(pool) => mysql::execute(pool, sql, table).await,
            DbPool::Sqlite(pool) => sqlite::execute(pool, sql, table).await,
        }
    }

    pub async fn close(&self) {
        match self {
            DbPool::MySql(pool) => pool.close().await,
            DbPool::Sqlite(pool) => pool.close().await,
        }
    }

    fn quote_ident(&self, name: &str) -> String {
        match self.kind() {
            BackendKind::MySql => quote_ident_mysql(name),
            BackendKind::Sqlite => quote_ident_sqlite(name),
        }
    }
}

// --- Identifier & Literal Rendering ---

pub fn quote_ident_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

pub fn quote_ident_sqlite(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// MySQL treats backslash as an escape character inside string literals;
/// SQLite gives it no special meaning, so only the quote is doubled there.
pub fn escape_sql_string(kind: BackendKind, value: &str) -> String {
    match kind {
        BackendKind::MySql => value.replace('\\', "\\\\").replace('\'', "''"),
        BackendKind::Sqlite => value.replace('\'', "''"),
    }
}

pub fn value_to_sql_literal(kind: BackendKind, value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(v) => match kind {
            BackendKind::MySql => {
                if *v {
                    "1".to_string()
                } else {
                    "0".to_string()
                }
            }
            BackendKind::Sqlite => {
                if *v {
                    "TRUE".to_string()
                } else {
                    "FALSE".to_string()
                }
            }
        },
        Value::Number(num) => num.to_string(),
        Value::String(s) => format!("'{}'", escape_sql_string(kind, s)),
        other => format!("'{}'", escape_sql_string(kind, &other.to_string())),
    }
}

pub fn sql_type_mysql(t: SqlType) -> &'static str {
    match t {
        SqlType::Integer => "BIGINT",
        SqlType::Float => "DOUBLE",
        SqlType::Boolean => "BOOLEAN",
        SqlType::Text => "TEXT",
    }
}

pub fn sql_type_sqlite(t: SqlType) -> &'static str {
    match t {
        SqlType::Integer => "INTEGER",
        SqlType::Float => "REAL",
        SqlType::Boolean => "BOOLEAN",
        SqlType::Text => "TEXT",
    }
}

// --- Row Value Decoding ---

pub fn row_values_mysql(row: &MySqlRow, column_count: usize) -> Vec<Value> {
    (0..column_count)
        .map(|i| {
            row.try_get_unchecked::<i64, _>(i)
                .map(|v| serde_json::json!(v))
                .or_else(|_| row.try_get_unchecked::<i32, _>(i).map(|v| serde_json::json!(v)))
                .or_else(|_| row.try_get_unchecked::<i16, _>(i).map(|v| serde_json::json!(v)))
                .or_else(|_| row.try_get_unchecked::<i8, _>(i).map(|v| serde_json::json!(v)))
                .or_else(|_| row.try_get_unchecked::<u64, _>(i).map(|v| serde_json::json!(v)))
                .or_else(|_| row.try_get_unchecked::<u32, _>(i).map(|v| serde_json::json!(v)))
                .or_else(|_| row.try_get_unchecked::<f64, _>(i).map(|v| serde_json::json!(v)))
                .or_else(|_| row.try_get_unchecked::<f32, _>(i).map(|v| serde_json::json!(v)))
                .or_else(|_| row.try_get_unchecked::<bool, _>(i).map(|v| serde_json::json!(v)))
                .or_else(|_| row.try_get_unchecked::<String, _>(i).map(|v| serde_json::json!(v)))
                .or_else(|_| {
                    row.try_get_unchecked::<Vec<u8>, _>(i)
                        .map(|bytes| serde_json::json!(String::from_utf8_lossy(&bytes).to_string()))
                })
                .unwrap_or(Value::Null)
        })
        .collect()
}

pub fn row_values_sqlite(row: &SqliteRow, column_count: usize) -> Vec<Value> {
    use sqlx::{TypeInfo, ValueRef};

    // SQLite types per value, not per column, so decode by the stored
    // value's own storage class rather than a fixed cascade.
    (0..column_count)
        .map(|i| {
            let Ok(raw) = row.try_get_raw(i) else {
                return Value::Null;
            };
            if raw.is_null() {
                return Value::Null;
            }
            match raw.type_info().name() {
                "INTEGER" => row
                    .try_get_unchecked::<i64, _>(i)
                    .map(|v| serde_json::json!(v))
                    .unwrap_or(Value::Null),
                "REAL" => row
                    .try_get_unchecked::<f64, _>(i)
                    .map(|v| serde_json::json!(v))
                    .unwrap_or(Value::Null),
                "BLOB" => row
                    .try_get_unchecked::<Vec<u8>, _>(i)
                    .map(|bytes| serde_json::json!(String::from_utf8_lossy(&bytes).to_string()))
                    .unwrap_or(Value::Null),
                _ => row
                    .try_get_unchecked::<String, _>(i)
                    .map(|v| serde_json::json!(v))
                    .unwrap_or(Value::Null),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests;
