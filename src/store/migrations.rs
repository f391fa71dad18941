//! Version-tracked schema migrations for the diagram collection.
//!
//! Each migration has a version number and SQL. `run_migrations()` checks the
//! current version and applies only the newer ones, in order. Every step runs
//! in its own transaction together with the insert of its version marker, so
//! a failed step leaves the store at the previous version and is retried on
//! the next open.

use libsql::Connection;

use crate::error::StoreError;

/// A single migration step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end; never edit an applied one.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "diagram_collection",
        sql: r#"
            CREATE TABLE IF NOT EXISTS diagrams (
                id TEXT PRIMARY KEY,
                updated_at INTEGER,
                body TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_diagrams_updated_at ON diagrams(updated_at);
        "#,
    },
    Migration {
        // v1 bodies carry `diagramPath` and no `isBookmark`.
        version: 2,
        name: "diagram_kind_and_bookmark",
        sql: r#"
            UPDATE diagrams SET body = json_remove(
                json_set(
                    body,
                    '$.diagram', COALESCE(
                        json_extract(body, '$.diagramPath'),
                        json_extract(body, '$.diagram'),
                        ''
                    ),
                    '$.isBookmark', json('false')
                ),
                '$.diagramPath'
            );
        "#,
    },
];

/// The schema version new writes use.
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

/// Run all pending migrations against the given connection.
pub async fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    run_migrations_to(conn, latest_version()).await
}

/// Apply pending migrations up to and including `target`.
///
/// Stopping short of the latest version is only useful for staging old
/// databases in tests.
pub async fn run_migrations_to(conn: &Connection, target: i64) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(|e| StoreError::Migration(format!("Failed to create _migrations table: {e}")))?;

    let applied = current_version(conn).await?;

    for migration in MIGRATIONS {
        if migration.version <= applied || migration.version > target {
            continue;
        }
        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        apply(conn, migration).await?;
    }

    let version = current_version(conn).await?;
    tracing::info!("Diagram store migrations complete (at V{version})");
    Ok(())
}

/// Get the highest applied migration version, or 0 if none.
pub async fn current_version(conn: &Connection) -> Result<i64, StoreError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| StoreError::Query(format!("Failed to query migration version: {e}")))?;

    let row = rows
        .next()
        .await
        .map_err(|e| StoreError::Query(format!("Failed to read migration version: {e}")))?;

    match row {
        Some(row) => row
            .get::<i64>(0)
            .map_err(|e| StoreError::Query(format!("Failed to parse migration version: {e}"))),
        None => Ok(0),
    }
}

/// Apply one migration and record it, atomically.
async fn apply(conn: &Connection, migration: &Migration) -> Result<(), StoreError> {
    let tx = conn.transaction().await.map_err(|e| {
        StoreError::Migration(format!(
            "Migration V{} ({}) could not begin: {e}",
            migration.version, migration.name
        ))
    })?;

    let outcome = async {
        tx.execute_batch(migration.sql)
            .await
            .map_err(|e| format!("{e}"))?;
        tx.execute(
            "INSERT INTO _migrations (version, name) VALUES (?1, ?2)",
            libsql::params![migration.version, migration.name],
        )
        .await
        .map_err(|e| format!("failed to record version: {e}"))?;
        Ok::<(), String>(())
    }
    .await;

    match outcome {
        Ok(()) => tx.commit().await.map_err(|e| {
            StoreError::Migration(format!(
                "Migration V{} ({}) failed to commit: {e}",
                migration.version, migration.name
            ))
        }),
        Err(reason) => {
            if let Err(e) = tx.rollback().await {
                tracing::warn!(version = migration.version, error = %e, "Rollback failed");
            }
            Err(StoreError::Migration(format!(
                "Migration V{} ({}) failed: {reason}",
                migration.version, migration.name
            )))
        }
    }
}
