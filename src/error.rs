//! Error types for diagram-sync.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Local store errors.
///
/// A missing record is never an error: deletes are idempotent and lookups
/// return `None`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing database could not be opened or connected to.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    Query(String),

    /// An upgrade transaction was rolled back; the store stays at its prior version.
    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors on the host-application boundary.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Host disconnected before {port} could be delivered")]
    HostDisconnected { port: String },

    #[error("Failed to serialize {port} payload: {reason}")]
    Serialization { port: String, reason: String },
}

/// Result type alias for diagram-sync.
pub type Result<T> = std::result::Result<T, Error>;
