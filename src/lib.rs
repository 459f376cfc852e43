//! tabferry: moves tabular data between relational databases (networked
//! MySQL, embedded SQLite) and flat files (xlsx workbooks, JSON collection
//! files). The core is the import reconciliation pipeline under
//! [`import`]; [`export`] is its read-direction mirror.

pub mod backend;
pub mod collection;
pub mod config;
pub mod error;
pub mod export;
pub mod import;
pub mod mysql;
pub mod source;
pub mod sqlite;
pub mod ssh_tunnel;
pub mod table;
pub mod workbook;

pub use backend::{BackendKind, DbPool};
pub use error::{Result, TransferError};
pub use source::{SourceData, SourceDataset};
pub use table::DataTable;
