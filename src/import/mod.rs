//! The import reconciliation and write pipeline.

pub mod collation;
pub mod debounce;
pub mod executor;
pub mod inspector;
pub mod models;
pub mod normalizer;
pub mod planner;
pub mod session;

pub use models::{
    ColumnDescriptor, ComparisonRecord, FieldEntry, FieldStatus, TableDescriptor, TableWriteReport,
    TargetSelection, WriteAction, WriteMode, WriteOptions,
};
pub use session::{ImportSession, SessionOptions, SessionOutcome, SessionState};
