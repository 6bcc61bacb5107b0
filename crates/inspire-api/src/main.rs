//! Urban Inspire API Server

use anyhow::Context;
use inspire_api::auth::spawn_session_pruner;
use inspire_api::{create_router, state::AppState};
use inspire_core::{AppConfig, LoggingConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &LoggingConfig) {
    let level = &config.level;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("inspire_api={level},inspire_store={level},audit={level},tower_http={level}").into()
    });

    if config.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Invalid configuration")?;
    init_tracing(&config.logging);

    let addr = config.server.bind_address();
    let prune_interval = config.auth.prune_interval_secs;

    let state = Arc::new(
        AppState::from_config(config)
            .await
            .context("Failed to initialize application state")?,
    );
    tracing::info!(storage = state.storage.name(), "Application state ready");

    if prune_interval > 0 {
        spawn_session_pruner(
            state.authenticator.clone(),
            Duration::from_secs(prune_interval),
        );
    }

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Urban Inspire API starting on http://{}", addr);
    tracing::info!("OpenAPI document at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
