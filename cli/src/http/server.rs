//! HTTP server lifecycle.

use std::net::SocketAddr;

use axum::{middleware, Router};
use ocbridge_core::api::{AppConfig, CliError};
use tokio::signal;
use tracing::info;

use super::{
    middleware::{create_cors_layer, request_logger},
    routes::create_router,
    AppState,
};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl From<&AppConfig> for ServerConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            host: cfg.http_server.host.clone(),
            port: cfg.http_server.port,
        }
    }
}

/// Router with logging and CORS applied.
pub fn build_app(state: AppState) -> Router {
    create_router(state)
        .layer(middleware::from_fn(request_logger))
        .layer(create_cors_layer())
}

/// Serve until Ctrl+C or SIGTERM.
pub async fn start_server(config: ServerConfig, state: AppState) -> Result<(), CliError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| CliError::Config(format!("invalid listen address {}:{}: {e}", config.host, config.port)))?;

    let app = build_app(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        target: "ocbridge.http",
        "OpenAI-compatible API listening on http://{} (model: {}, backend: {})",
        addr,
        state.model(),
        state.driver.backend_name()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(target: "ocbridge.http", "Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    tokio::select! {
        res = signal::ctrl_c() => {
            if let Err(e) = res {
                tracing::warn!(target: "ocbridge.http", error = %e, "Ctrl+C handler failed");
            }
            info!(target: "ocbridge.http", "Received Ctrl+C signal");
        }
        _ = wait_for_sigterm() => {
            info!(target: "ocbridge.http", "Received SIGTERM signal");
        }
    }
    info!(target: "ocbridge.http", "Starting graceful shutdown...");
}

#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!(target: "ocbridge.http", error = %e, "cannot install SIGTERM handler");
            std::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    std::future::pending::<()>().await
}
