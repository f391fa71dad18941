use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;

use diagram_sync::bridge::sync_routes;
use diagram_sync::config::SyncConfig;
use diagram_sync::store::{DiagramStore, LibSqlBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = SyncConfig::from_env().context("invalid configuration")?;

    eprintln!("📐 Diagram Sync v{}", env!("CARGO_PKG_VERSION"));

    // ── Database ─────────────────────────────────────────────────────────
    let store: Arc<dyn DiagramStore> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("failed to open database at {}", config.db_path.display()))?,
    );
    let schema_version = store.schema_version().await?;

    eprintln!(
        "   Database: {} (schema V{})",
        config.db_path.display(),
        schema_version
    );
    eprintln!("   Render target: #{}", config.thumbnail.target_id);
    eprintln!("   Host WS: ws://0.0.0.0:{}/ws\n", config.port);

    // ── Host bridge ──────────────────────────────────────────────────────
    let app = sync_routes(store, config.thumbnail.clone()).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "Host bridge started");
    axum::serve(listener, app).await?;

    Ok(())
}
