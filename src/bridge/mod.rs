//! Host bridge — exposes the sync boundary to a browser-hosted editor.

pub mod ws;

pub use ws::sync_routes;
