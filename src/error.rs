use thiserror::Error;

/// Failure taxonomy for the conversion core.
///
/// Planner-stage failures (`SourceUnreadable`, `UnitNotFound`) isolate per
/// table; write-stage failures (`CollationMismatch`, `TableWriteError`)
/// abort the affected table only, except a collation mismatch on a required
/// single-table import, which aborts the whole operation.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("source unreadable: {0}")]
    SourceUnreadable(String),

    #[error("unit '{unit}' not found in source (available: {})", .available.join(", "))]
    UnitNotFound {
        unit: String,
        available: Vec<String>,
    },

    #[error("collation mismatch on table '{table}': table is '{actual}', requested '{requested}'")]
    CollationMismatch {
        table: String,
        actual: String,
        requested: String,
    },

    #[error("write to table '{table}' failed: {message}")]
    TableWriteError { table: String, message: String },

    #[error("cannot infer a column type for '{column}': {detail}")]
    SchemaInferenceAmbiguous { column: String, detail: String },

    #[error("missing connection configuration: {0}")]
    ConfigurationMissing(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("SSH tunnel failed: {0}")]
    Tunnel(String),

    #[error("output write failed: {0}")]
    OutputWrite(String),
}

pub type Result<T> = std::result::Result<T, TransferError>;
