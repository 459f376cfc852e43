// =====================================================
// SQLITE SPECIFIC DATABASE OPERATIONS
// =====================================================

use crate::backend::{quote_ident_sqlite, row_values_sqlite, sql_type_sqlite};
use crate::error::{Result, TransferError};
use crate::import::models::{ColumnDescriptor, TableDescriptor};
use crate::table::{DataTable, SqlType};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, ConnectOptions, Pool, Row, Sqlite};

// --- Connection ---

fn build_connect_options(db_path: &str) -> SqliteConnectOptions {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    options.log_statements(log::LevelFilter::Debug)
}

pub async fn create_pool(db_path: &str) -> Result<Pool<Sqlite>> {
    if db_path.is_empty() {
        return Err(TransferError::ValidationError(
            "database file path is required".to_string(),
        ));
    }

    SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect_with(build_connect_options(db_path))
        .await
        .map_err(|e| {
            TransferError::ConfigurationMissing(format!("failed to open SQLite database: {e}"))
        })
}

/// Single-connection in-memory pool, used by tests and scratch conversions.
pub async fn create_memory_pool() -> Result<Pool<Sqlite>> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        // The database lives in the one connection; never recycle it.
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(SqliteConnectOptions::new().in_memory(true))
        .await
        .map_err(|e| {
            TransferError::ConfigurationMissing(format!("failed to open in-memory database: {e}"))
        })
}

// --- Schema Probes ---

pub async fn list_tables(pool: &Pool<Sqlite>) -> Result<Vec<String>> {
    let rows = sqlx::query(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| TransferError::SourceUnreadable(format!("failed to fetch tables: {e}")))?;

    Ok(rows
        .iter()
        .filter_map(|r| r.try_get::<String, _>("name").ok())
        .collect())
}

pub async fn describe_table(pool: &Pool<Sqlite>, table: &str) -> Result<Option<TableDescriptor>> {
    let query = format!("PRAGMA table_info({})", quote_ident_sqlite(table));
    let rows = sqlx::query(&query)
        .fetch_all(pool)
        .await
        .map_err(|e| TransferError::TableWriteError {
            table: table.to_string(),
            message: format!("failed to fetch table info: {e}"),
        })?;

    if rows.is_empty() {
        return Ok(None);
    }

    let columns = rows
        .iter()
        .map(|row| {
            let name = row.try_get::<String, _>("name").unwrap_or_default();
            let data_type = row.try_get::<String, _>("type").unwrap_or_default();
            let pk = row.try_get::<i64, _>("pk").unwrap_or(0);
            // An INTEGER primary key is a rowid alias, so its values are
            // server-assigned just like a MySQL auto_increment column.
            let extra = if pk > 0 && data_type.eq_ignore_ascii_case("integer") {
                "auto_increment".to_string()
            } else {
                String::new()
            };
            ColumnDescriptor {
                name,
                data_type,
                column_key: if pk > 0 { "PRI".to_string() } else { String::new() },
                extra,
                collation: None,
            }
        })
        .collect();

    // SQLite has no per-table collation metadata.
    Ok(Some(TableDescriptor {
        name: table.to_string(),
        columns,
        collation: None,
    }))
}

// --- Data Movement ---

pub async fn fetch_table(pool: &Pool<Sqlite>, table: &str) -> Result<DataTable> {
    let query = format!("SELECT * FROM {}", quote_ident_sqlite(table));
    let rows = sqlx::query(&query)
        .fetch_all(pool)
        .await
        .map_err(|e| TransferError::TableWriteError {
            table: table.to_string(),
            message: format!("failed to read table: {e}"),
        })?;

    let mut result = rows_to_table(&rows);
    if result.columns.is_empty() {
        if let Some(descriptor) = describe_table(pool, table).await? {
            result.columns = descriptor.columns.into_iter().map(|c| c.name).collect();
        }
    }
    Ok(result)
}

pub async fn run_query(pool: &Pool<Sqlite>, sql: &str) -> Result<DataTable> {
    let rows = sqlx::query(sql)
        .fetch_all(pool)
        .await
        .map_err(|e| TransferError::ValidationError(format!("query failed: {e}")))?;

    Ok(rows_to_table(&rows))
}

pub async fn execute(pool: &Pool<Sqlite>, sql: &str, table: &str) -> Result<u64> {
    sqlx::query(sql)
        .execute(pool)
        .await
        .map(|done| done.rows_affected())
        .map_err(|e| TransferError::TableWriteError {
            table: table.to_string(),
            message: e.to_string(),
        })
}

pub fn create_table_sql(table: &str, schema: &[(String, SqlType)]) -> String {
    let columns = schema
        .iter()
        .map(|(name, sql_type)| {
            format!("{} {}", quote_ident_sqlite(name), sql_type_sqlite(*sql_type))
        })
        .collect::<Vec<String>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", quote_ident_sqlite(table), columns)
}

// --- Row Decoding ---

fn rows_to_table(rows: &[SqliteRow]) -> DataTable {
    let columns: Vec<String> = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();

    DataTable {
        rows: rows
            .iter()
            .map(|row| row_values_sqlite(row, columns.len()))
            .collect(),
        columns,
    }
}
