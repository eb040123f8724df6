//! GET /api/v1/metrics — per-endpoint counters and latency percentiles.

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

use crate::auth;
use crate::core::app_state::AppState;
use crate::error_handler::{ApiError, ApiResult};
use crate::middleware_layer::request_meta::RequestMeta;
use crate::routes;

#[derive(Debug, Serialize)]
struct MetricsResponse {
    endpoints: Value,
    #[serde(rename = "requestId")]
    request_id: String,
    timestamp: String,
}

/// Handler: GET /api/v1/metrics (authenticated, not rate limited).
pub async fn metrics(State(state): State<Arc<AppState>>, request: Request<Body>) -> Response {
    let meta = routes::meta_of(&request);
    let started = Instant::now();
    let outcome = pipeline(&state, &meta, &request);
    routes::finish(&state, "metrics", started, &meta, outcome)
}

fn pipeline(
    state: &AppState,
    meta: &RequestMeta,
    request: &Request<Body>,
) -> ApiResult<Response> {
    auth::require_token(request.headers(), &state.config.api_secret_token)?;

    let snapshot = state.metrics.snapshot();
    let endpoints = serde_json::to_value(&snapshot).map_err(|_| ApiError::Internal)?;

    let body = MetricsResponse {
        endpoints,
        request_id: meta.request_id.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}
