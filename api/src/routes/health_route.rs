//! GET /api/v1/health — dependency checks without provider details.
//!
//! Status ladder: `unhealthy` when the store check fails, `degraded`
//! when the store passes but a non-critical check fails, `ok` when all
//! pass. Provider names and version strings are omitted by policy.

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tokio::time::timeout;

use answerer::timeouts::DB_READ;

use crate::core::app_state::AppState;
use crate::routes;

/// Handler: GET /api/v1/health (public, not rate limited).
pub async fn health(State(state): State<Arc<AppState>>, request: Request<Body>) -> Response {
    let meta = routes::meta_of(&request);
    let started = Instant::now();

    let store_latency_ms = match timeout(DB_READ, state.store.ping()).await {
        Ok(Ok(ping)) => Some(ping.latency_ms),
        _ => None,
    };
    let vector_ok = matches!(
        timeout(DB_READ, state.store.has_vector_extension()).await,
        Ok(Ok(true))
    );
    let embedder_ok = state.embedder_probe.check().await;

    let store_ok = store_latency_ms.is_some();
    let (status, http_status) = if !store_ok {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    } else if vector_ok && embedder_ok {
        ("ok", StatusCode::OK)
    } else {
        ("degraded", StatusCode::OK)
    };

    let body = json!({
        "status": status,
        "checks": {
            "store": { "ok": store_ok, "latency_ms": store_latency_ms },
            "vector_extension": { "ok": vector_ok },
            "embedder": { "ok": embedder_ok },
        },
        "requestId": meta.request_id,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    state
        .metrics
        .observe("health", started.elapsed().as_millis() as u64, !store_ok);

    (http_status, Json(body)).into_response()
}
