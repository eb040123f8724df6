//! Route handlers and the shared request pipeline steps.
//!
//! Mutating endpoints run the same ordered pipeline: auth → declared
//! size → rate limit → decode → validate → injection → business →
//! write. Any step short-circuits with an `ApiError`; [`finish`]
//! records metrics for every outcome and renders the error shape.

pub mod chat;
pub mod health_route;
pub mod metrics_route;
pub mod retrieve;

use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode, header};
use axum::response::Response;

use crate::core::app_state::AppState;
use crate::error_handler::ApiError;
use crate::middleware_layer::request_meta::RequestMeta;
use crate::rate_limit::RateDecision;

/// Hard request-body bound (50 KiB).
pub const MAX_BODY_BYTES: usize = 51_200;

/// Pulls the request context installed by the outermost middleware.
pub(crate) fn meta_of(request: &Request<Body>) -> RequestMeta {
    request
        .extensions()
        .get::<RequestMeta>()
        .cloned()
        .unwrap_or_default()
}

/// Rejects on a declared `Content-Length` above the bound, before the
/// body is read. Absent or unparsable lengths fall through to the
/// while-reading bound in [`read_body`].
pub(crate) fn ensure_declared_size(headers: &HeaderMap) -> Result<(), ApiError> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    match declared {
        Some(len) if len > MAX_BODY_BYTES as u64 => Err(ApiError::PayloadTooLarge),
        _ => Ok(()),
    }
}

/// Reads the body under the same bound, mapping an exceeded limit to
/// 413 and any other read failure to 400.
pub(crate) async fn read_body(body: Body) -> Result<Bytes, ApiError> {
    match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => Ok(bytes),
        Err(err) => {
            let mut cause: Option<&(dyn std::error::Error + 'static)> = Some(&err);
            while let Some(e) = cause {
                if e.is::<http_body_util::LengthLimitError>() {
                    return Err(ApiError::PayloadTooLarge);
                }
                cause = e.source();
            }
            Err(ApiError::BadRequest {
                message: "request body could not be read".into(),
            })
        }
    }
}

/// Closes out one handled request: metrics for every outcome, error
/// logging per taxonomy, and the canonical error body on failure.
pub(crate) fn finish(
    state: &AppState,
    endpoint: &'static str,
    started: Instant,
    meta: &RequestMeta,
    outcome: Result<Response, ApiError>,
) -> Response {
    let latency_ms = started.elapsed().as_millis() as u64;
    match outcome {
        Ok(response) => {
            state.metrics.observe(endpoint, latency_ms, false);
            response
        }
        Err(err) => {
            if matches!(err, ApiError::RateLimited { .. }) {
                state.metrics.rate_limit_hit(endpoint);
            }
            state.metrics.observe(endpoint, latency_ms, true);
            err.log(&meta.request_id);
            err.respond(&meta.request_id)
        }
    }
}

/// Advertises the quota left in the current window.
pub(crate) fn rate_limit_headers(response: &mut Response, decision: RateDecision) {
    if let Ok(value) = HeaderValue::from_str(&decision.remaining.to_string()) {
        response.headers_mut().insert("x-ratelimit-remaining", value);
    }
}

/// CORS preflight for the mutating endpoints; the header middleware
/// supplies the actual CORS fields.
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Fallback handler for unmatched routes.
pub async fn not_found(request: Request<Body>) -> Response {
    let meta = meta_of(&request);
    ApiError::NotFound.respond(&meta.request_id)
}
