//! HTTP delivery surface.

use crate::config::Config;
use crate::storage::LocalStore;
use crate::streaming::{LocalOrigin, Origins, RemoteFetcher, RemoteOrigin};
use anyhow::{Context, Result};
use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use streamdrop_db::pool::DbPool;
use tokio::signal;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod expired;
pub mod routes_delivery;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    /// Record registry
    pub db: DbPool,
    /// Origin implementations, picked per record; the local one owns the byte store
    pub origins: Origins,
}

impl AppContext {
    /// Wire the standard local and remote origins around `store`.
    pub fn new(config: Config, db: DbPool, store: LocalStore) -> Result<Self> {
        let fetcher = RemoteFetcher::new(Duration::from_secs(config.server.remote_timeout_secs))?;
        let origins = Origins::new(
            Arc::new(LocalOrigin::new(store)),
            Arc::new(RemoteOrigin::new(fetcher)),
        );
        Ok(Self {
            config: Arc::new(config),
            db,
            origins,
        })
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/stream/{id}", get(routes_delivery::stream_file))
        .route("/file/{id}", get(routes_delivery::download_file))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Serve HTTP until SIGINT or SIGTERM
pub async fn start_server(ctx: AppContext) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", ctx.config.server.host, ctx.config.server.port)
        .parse()
        .context("Invalid server address")?;

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
