//! Stock Events - stock, price history and event tracking
//!
//! Stocks, their daily prices and news-like events behind one data-access
//! layer with two interchangeable backends (SQLite or JSON files), served
//! over a small REST API.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod state;

use api::ApiServer;
use config::AppConfig;
use state::AppState;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging, open the stores and serve until Ctrl-C
pub async fn run() -> anyhow::Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stock_events=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Stock Events...");

    let config = AppConfig::from_env()?;
    tracing::info!(
        "Stores: stocks={}, events={}",
        config.store.stock_backend,
        config.store.event_backend
    );

    // Opening SQLite and running migrations blocks
    let state = tokio::task::spawn_blocking(move || AppState::new(config)).await??;

    let server = ApiServer::start(Arc::new(state))
        .await
        .map_err(anyhow::Error::msg)?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    server.shutdown().await;

    tracing::info!("Stock Events stopped");
    Ok(())
}
