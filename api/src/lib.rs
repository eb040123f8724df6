//! HTTP surface of the HR knowledge-base assistant.
//!
//! Routes, auth, rate limiting, validation, and the cross-cutting
//! request plumbing live here; retrieval and chat semantics live in
//! the `answerer` crate.

use std::sync::Arc;

pub mod auth;
mod core;
mod error_handler;
pub mod injection;
pub mod metrics;
mod middleware_layer;
pub mod rate_limit;
pub mod routes;

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use thiserror::Error;
use tokio::signal;

pub use crate::core::app_state::{AppConfig, AppState, ConfigError, RuntimeEnv};
pub use crate::error_handler::{ApiError, ApiResult, FieldIssue};
use crate::middleware_layer::request_meta::request_meta;
use crate::middleware_layer::response_headers::response_headers;
use crate::routes::chat::chat_route::chat;
use crate::routes::retrieve::retrieve_route::retrieve;
use crate::routes::{health_route, metrics_route};

/// Startup failures, split so the process wrapper can map exit codes.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),
}

/// Binds the configured address and serves until shutdown.
pub async fn start(state: Arc<AppState>) -> Result<(), StartError> {
    let bind_address = state.config.bind_address.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .map_err(StartError::Bind)?;

    tracing::info!(%bind_address, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartError::Server)?;

    tracing::info!("server shutdown complete");
    Ok(())
}

/// Builds the router with all routes and middleware.
///
/// Handler order for the mutating endpoints is enforced inside their
/// pipelines; the layers here only add the request id (outermost) and
/// the cache/CORS headers on every response.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/chat", post(chat).options(routes::preflight))
        .route(
            "/api/v1/retrieve",
            post(retrieve).options(routes::preflight),
        )
        .route("/api/v1/metrics", get(metrics_route::metrics))
        .route("/api/v1/health", get(health_route::health))
        .fallback(routes::not_found)
        .layer(from_fn_with_state(state.clone(), response_headers))
        .layer(from_fn(request_meta))
        .with_state(state)
}

/// Graceful shutdown on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for shutdown signal: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!("failed to install SIGTERM handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
