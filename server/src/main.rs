//! Scopegate Server - Main Entry Point
//!
//! Authorization core: permission resolution and scope enforcement.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use scopegate_server::{api, audit::AuditRecorder, config, db, permissions};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scopegate_server=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Scopegate Server"
    );

    // Initialize database
    let db_pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&db_pool).await?;

    // Load the permission catalog before serving
    let source = Arc::new(permissions::PgPermissionSource::new(db_pool.clone()));
    let engine = Arc::new(permissions::PermissionEngine::new(
        source,
        config.override_cache_ttl(),
    ));
    engine
        .reload_catalog()
        .await
        .context("Failed to load permission catalog")?;
    let refresh_task =
        permissions::spawn_refresh_task(Arc::clone(&engine), config.catalog_refresh_interval());

    // Build application state
    let audit = AuditRecorder::postgres(db_pool.clone());
    let state = api::AppState::new(db_pool, config.clone(), engine, audit)
        .context("Invalid JWT_PUBLIC_KEY")?;

    // Build router
    let app = api::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Server listening");

    // Graceful shutdown handler
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    refresh_task.abort();
    info!("Server shutdown complete");

    Ok(())
}
