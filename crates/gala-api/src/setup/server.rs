//! HTTP server startup and graceful shutdown.

use anyhow::{Context, Result};
use axum::Router;
use gala_core::Config;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::state::AppState;

pub async fn start_server(config: &Config, router: Router, state: Arc<AppState>) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .context("Server error")?;

    Ok(())
}

/// Resolves on SIGINT or SIGTERM, then stops the worker pool from claiming
/// further jobs. In-flight jobs finish or hit their timeout.
async fn shutdown_signal(state: Arc<AppState>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    state.queue.shutdown().await;
}
