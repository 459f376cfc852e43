// =====================================================
// MySQL SPECIFIC DATABASE OPERATIONS
// =====================================================

use crate::backend::{quote_ident_mysql, row_values_mysql, sql_type_mysql};
use crate::config::ConnectionProfile;
use crate::error::{Result, TransferError};
use crate::import::models::{ColumnDescriptor, TableDescriptor};
use crate::table::{DataTable, SqlType};
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, ConnectOptions, MySql, Pool, Row};

// --- Connection ---

pub async fn create_pool(profile: &ConnectionProfile) -> Result<Pool<MySql>> {
    let mut options = MySqlConnectOptions::new()
        .host(&profile.host)
        .port(profile.port)
        .username(&profile.user)
        .database(&profile.database);

    if !profile.password.is_empty() {
        options = options.password(&profile.password);
    }

    options = options.log_statements(log::LevelFilter::Debug).to_owned();

    MySqlPoolOptions::new()
        .max_connections(4)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .idle_timeout(std::time::Duration::from_secs(300))
        .connect_with(options)
        .await
        .map_err(|e| {
            let message = e.to_string();
            if message.contains("os error 111") {
                return TransferError::ConfigurationMissing(format!(
                    "connection refused: check that MySQL is running on {}:{}",
                    profile.host, profile.port
                ));
            }
            TransferError::ConfigurationMissing(format!("failed to connect: {message}"))
        })
}

// --- Schema Probes ---

pub async fn list_tables(pool: &Pool<MySql>) -> Result<Vec<String>> {
    let rows = sqlx::query("SHOW TABLES")
        .fetch_all(pool)
        .await
        .map_err(|e| TransferError::SourceUnreadable(format!("failed to fetch tables: {e}")))?;

    Ok(rows
        .iter()
        .map(|row| {
            row.try_get::<String, _>(0).unwrap_or_else(|_| {
                let bytes: Vec<u8> = row.get(0);
                String::from_utf8_lossy(&bytes).to_string()
            })
        })
        .collect())
}

/// Describes an existing table, or returns `None` when the table does not
/// exist. Absence is the expected first-import case, not an error.
pub async fn describe_table(pool: &Pool<MySql>, table: &str) -> Result<Option<TableDescriptor>> {
    let rows = sqlx::query(
        r#"
        SELECT COLUMN_NAME, DATA_TYPE, COLUMN_KEY, EXTRA, COLLATION_NAME
        FROM information_schema.columns
        WHERE table_schema = DATABASE() AND table_name = ?
        ORDER BY ORDINAL_POSITION
        "#,
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(|e| TransferError::TableWriteError {
        table: table.to_string(),
        message: format!("failed to fetch columns: {e}"),
    })?;

    if rows.is_empty() {
        return Ok(None);
    }

    let columns = rows
        .iter()
        .map(|row| ColumnDescriptor {
            name: read_text_column(row, "COLUMN_NAME"),
            data_type: read_text_column(row, "DATA_TYPE"),
            column_key: read_text_column(row, "COLUMN_KEY"),
            extra: read_text_column(row, "EXTRA"),
            collation: row
                .try_get::<Option<String>, _>("COLLATION_NAME")
                .ok()
                .flatten(),
        })
        .collect();

    let collation = sqlx::query(
        r#"
        SELECT TABLE_COLLATION
        FROM information_schema.tables
        WHERE table_schema = DATABASE() AND table_name = ?
        "#,
    )
    .bind(table)
    .fetch_optional(pool)
    .await
    .map_err(|e| TransferError::TableWriteError {
        table: table.to_string(),
        message: format!("failed to fetch table collation: {e}"),
    })?
    .and_then(|row| row.try_get::<Option<String>, _>(0).ok().flatten());

    Ok(Some(TableDescriptor {
        name: table.to_string(),
        columns,
        collation,
    }))
}

/// The schema's default collation. Degrades to `None` when the metadata
/// query fails (insufficient privilege, older server), never errors.
pub async fn default_collation(pool: &Pool<MySql>) -> Option<String> {
    let result = sqlx::query(
        r#"
        SELECT DEFAULT_COLLATION_NAME
        FROM information_schema.schemata
        WHERE schema_name = DATABASE()
        "#,
    )
    .fetch_optional(pool)
    .await;

    match result {
        Ok(row) => row.and_then(|r| r.try_get::<Option<String>, _>(0).ok().flatten()),
        Err(e) => {
            log::warn!("default collation probe failed: {e}");
            None
        }
    }
}

/// All utf8mb4 collations the server offers, for operator display.
pub async fn list_collations(pool: &Pool<MySql>) -> Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
        SELECT COLLATION_NAME
        FROM information_schema.COLLATIONS
        WHERE CHARACTER_SET_NAME = 'utf8mb4'
        ORDER BY COLLATION_NAME
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(|e| TransferError::SourceUnreadable(format!("failed to fetch collations: {e}")))?;

    Ok(rows
        .iter()
        .filter_map(|row| row.try_get::<String, _>(0).ok())
        .collect())
}

// --- Data Movement ---

pub async fn fetch_table(pool: &Pool<MySql>, table: &str) -> Result<DataTable> {
    let query = format!("SELECT * FROM {}", quote_ident_mysql(table));
    let rows = sqlx::query(&query)
        .fetch_all(pool)
        .await
        .map_err(|e| TransferError::TableWriteError {
            table: table.to_string(),
            message: format!("failed to read table: {e}"),
        })?;

    let mut result = rows_to_table(&rows);
    if result.columns.is_empty() {
        // Empty tables still export with a header row.
        if let Some(descriptor) = describe_table(pool, table).await? {
            result.columns = descriptor.columns.into_iter().map(|c| c.name).collect();
        }
    }
    Ok(result)
}

/// Runs operator-supplied SQL as a single prepared statement. The text is
/// never interpolated into another statement.
pub async fn run_query(pool: &Pool<MySql>, sql: &str) -> Result<DataTable> {
    let rows = sqlx::query(sql)
        .fetch_all(pool)
        .await
        .map_err(|e| TransferError::ValidationError(format!("query failed: {e}")))?;

    Ok(rows_to_table(&rows))
}

pub async fn execute(pool: &Pool<MySql>, sql: &str, table: &str) -> Result<u64> {
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
            format!("{} {}", quote_ident_mysql(name), sql_type_mysql(*sql_type))
        })
        .collect::<Vec<String>>()
        .join(", ");
    format!(
        "CREATE TABLE {} ({}) CHARACTER SET utf8mb4",
        quote_ident_mysql(table),
        columns
    )
}

/// Converts the table to the requested collation after a full (re)create.
pub async fn apply_collation(pool: &Pool<MySql>, table: &str, collation: &str) -> Result<()> {
    let sql = format!(
        "ALTER TABLE {} CONVERT TO CHARACTER SET utf8mb4 COLLATE {}",
        quote_ident_mysql(table),
        collation
    );
    execute(pool, &sql, table).await.map(|_| ())
}

// --- Row Decoding ---

fn rows_to_table(rows: &[MySqlRow]) -> DataTable {
    let columns: Vec<String> = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();

    DataTable {
        rows: rows
            .iter()
            .map(|row| row_values_mysql(row, columns.len()))
            .collect(),
        columns,
    }
}

fn read_text_column(row: &MySqlRow, name: &str) -> String {
    // Older servers hand metadata back as byte strings.
    row.try_get::<String, _>(name).unwrap_or_else(|_| {
        row.try_get::<Vec<u8>, _>(name)
            .map(|bytes| String::from_utf8_lossy(&bytes).to_string())
            .unwrap_or_default()
    })
}
