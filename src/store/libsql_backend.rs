//! libSQL backend — async `DiagramStore` implementation.
//!
//! Each diagram is one row: the id as key, the JSON body, and a copy of
//! `updatedAt` in its own indexed column for recency queries. Supports local
//! file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::diagram::{DiagramDocument, DiagramRecord};
use crate::error::StoreError;
use crate::store::migrations;
use crate::store::traits::DiagramStore;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        info!(path = %path.display(), "Diagram store opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                StoreError::Unavailable(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, StoreError> {
        let conn = db
            .connect()
            .map_err(|e| StoreError::Unavailable(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Get the connection.
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Map a `(id, body)` row to a document. The row key wins over any id in the body.
fn row_to_document(row: &libsql::Row) -> Result<DiagramDocument, StoreError> {
    let id: String = row
        .get(0)
        .map_err(|e| StoreError::Query(format!("diagram row id: {e}")))?;
    let body: String = row
        .get(1)
        .map_err(|e| StoreError::Query(format!("diagram row body: {e}")))?;
    let document: DiagramDocument = serde_json::from_str(&body)
        .map_err(|e| StoreError::Serialization(format!("diagram {id}: {e}")))?;
    Ok(DiagramDocument { id, ..document })
}

#[async_trait]
impl DiagramStore for LibSqlBackend {
    async fn init_schema(&self) -> Result<(), StoreError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn schema_version(&self) -> Result<i64, StoreError> {
        migrations::current_version(self.conn()).await
    }

    async fn put(&self, record: &DiagramRecord) -> Result<String, StoreError> {
        let conn = self.conn();
        let id = record
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let stored = DiagramRecord {
            id: Some(id.clone()),
            ..record.clone()
        };
        let body = serde_json::to_string(&stored)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        conn.execute(
            "INSERT OR REPLACE INTO diagrams (id, updated_at, body) VALUES (?1, ?2, ?3)",
            params![id.as_str(), stored.updated_at, body],
        )
        .await
        .map_err(|e| StoreError::Query(format!("put: {e}")))?;

        debug!(id = %id, title = %stored.title, "Diagram written");
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<DiagramDocument>, StoreError> {
        let conn = self.conn();
        let mut rows = conn
            .query("SELECT id, body FROM diagrams WHERE id = ?1", params![id])
            .await
            .map_err(|e| StoreError::Query(format!("get: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_document(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Query(format!("get row: {e}"))),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.conn();
        let count = conn
            .execute("DELETE FROM diagrams WHERE id = ?1", params![id])
            .await
            .map_err(|e| StoreError::Query(format!("delete: {e}")))?;
        debug!(id = %id, removed = count > 0, "Diagram deleted");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<DiagramDocument>, StoreError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT id, body FROM diagrams ORDER BY updated_at IS NULL, updated_at DESC",
                (),
            )
            .await
            .map_err(|e| StoreError::Query(format!("list: {e}")))?;

        let mut documents = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("list row: {e}")))?
        {
            documents.push(row_to_document(&row)?);
        }
        Ok(documents)
    }
}
