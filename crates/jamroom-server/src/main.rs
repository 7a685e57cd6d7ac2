//! Jamroom Server
//!
//! Axum backend serving shared listening rooms over HTTP/JSON, backed by the
//! Spotify Web API for track metadata and search.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use jamroom_core::{RoomManager, SystemClock};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::Config,
    handler::{AppState, build_router},
    service::{playback_driver, spotify::SpotifyCatalog},
};

mod config;
mod handler;
mod service;
mod util;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    let addr = config.bind;

    let catalog = SpotifyCatalog::new(config.spotify()).context("failed to build Spotify client")?;
    let manager = Arc::new(RoomManager::new(Arc::new(catalog), Arc::new(SystemClock)));
    let driver = playback_driver::spawn(manager.clone(), config.driver());

    let app = build_router(AppState::new(manager));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("Server listening on {addr}");
    tracing::info!("  - Rooms: http://{addr}/api/rooms");
    tracing::info!("  - Search: http://{addr}/api/search?query=...");
    tracing::info!("  - Health: http://{addr}/health");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    driver.abort();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
