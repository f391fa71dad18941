//! Persistence layer — libSQL-backed local diagram collection.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::DiagramStore;
