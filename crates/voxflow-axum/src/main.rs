//! `voxflow-server` entry point.

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use voxflow_axum::{ServerArgs, start_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before clap reads environment fallbacks
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerArgs::parse().into_config()?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!(target: "voxflow.bootstrap", "Shutdown requested");
                    shutdown.cancel();
                }
                Err(e) => tracing::warn!("Failed to listen for Ctrl+C: {}", e),
            }
        }
    });

    start_server(config, shutdown).await
}
