//! `DiagramStore` trait — single async interface for local diagram persistence.

use async_trait::async_trait;

use crate::diagram::{DiagramDocument, DiagramRecord};
use crate::error::StoreError;

/// Backend-agnostic local diagram collection.
#[async_trait]
pub trait DiagramStore: Send + Sync {
    /// Run all pending schema migrations.
    async fn init_schema(&self) -> Result<(), StoreError>;

    /// Highest schema version applied to this store.
    async fn schema_version(&self) -> Result<i64, StoreError>;

    /// Insert or overwrite `record` at its id, generating a UUID when it has none.
    /// Returns the id the record was written under.
    async fn put(&self, record: &DiagramRecord) -> Result<String, StoreError>;

    /// Read a single record as stored.
    async fn get(&self, id: &str) -> Result<Option<DiagramDocument>, StoreError>;

    /// Remove a record. Removing a missing id succeeds.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// All records, most recently updated first.
    async fn list(&self) -> Result<Vec<DiagramDocument>, StoreError>;
}
