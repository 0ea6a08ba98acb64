mod api;
mod config;
mod error;
mod events;
mod main_lib;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::main_lib::build_state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;
    let listen_addr = config.listen_addr;
    let state = build_state(config)?;
    info!(
        "Worker for {} ({})",
        state.config.worker.origin_url, state.config.worker.cache_names.pages
    );

    // A failed install leaves the previous partitions in place; fetches
    // still work and install can be retried through /__sw/install.
    match state.worker.install().await {
        Ok(report) => info!(
            "Installed; {} stale partition(s) removed",
            report.deleted_partitions.len()
        ),
        Err(err) => warn!("Install failed: {}", err),
    }
    for report in state.worker.sync_all().await {
        if report.attempted > 0 {
            info!(
                "Replayed {}/{} queued action(s) for {}",
                report.replayed, report.attempted, report.tag
            );
        }
    }

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("Failed to bind {listen_addr}"))?;
    info!("Listening on {}", listen_addr);

    axum::serve(listener, api::app_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
