//! Destination schema inspection.
//!
//! The planner talks to the destination through this trait so its
//! reconciliation logic can be exercised against a scripted schema in
//! tests. `DbPool` is the production implementation.

use crate::backend::DbPool;
use crate::error::Result;
use crate::import::models::TableDescriptor;
use async_trait::async_trait;

#[async_trait]
pub trait SchemaInspector: Send + Sync {
    /// `Ok(None)` when the table does not exist. Absence is the expected
    /// first-time-import case, never an error.
    async fn describe_table(&self, table: &str) -> Result<Option<TableDescriptor>>;

    /// The destination's default collation; `None` when it cannot be
    /// determined. Never fatal.
    async fn default_collation(&self) -> Option<String>;
}

#[async_trait]
impl SchemaInspector for DbPool {
    async fn describe_table(&self, table: &str) -> Result<Option<TableDescriptor>> {
        DbPool::describe_table(self, table).await
    }

    async fn default_collation(&self) -> Option<String> {
        DbPool::default_collation(self).await
    }
}
