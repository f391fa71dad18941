//! Diagram Sync — local diagram store and host/remote sync boundary.

pub mod bridge;
pub mod config;
pub mod diagram;
pub mod error;
pub mod store;
pub mod sync;
pub mod thumbnail;
