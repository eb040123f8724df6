//! Request identity and the per-request log pair.
//!
//! Every request gets a fresh id before anything else runs; the id is
//! stored in the request extensions for handlers and echoed back in
//! the `X-Request-Id` response header. Sensitive headers never reach
//! the log stream.

use std::time::Instant;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, info};
use uuid::Uuid;

/// Per-request context owned by the handler servicing the request.
#[derive(Clone, Debug, Default)]
pub struct RequestMeta {
    pub request_id: String,
}

/// Outermost middleware: id generation plus start/complete logs.
pub async fn request_meta(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    request.extensions_mut().insert(RequestMeta {
        request_id: request_id.clone(),
    });

    let started = Instant::now();
    info!(%method, path = %path, request_id = %request_id, "request started");
    debug!(
        headers = ?sanitized_headers(request.headers()),
        request_id = %request_id,
        "request headers"
    );

    let mut response = next.run(request).await;

    info!(
        %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        request_id = %request_id,
        "request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Header names whose values must never be logged.
const SENSITIVE_HEADERS: [&str; 2] = ["authorization", "x-access-token"];

/// Copies headers for logging with credential values replaced.
pub fn sanitized_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let name = name.as_str().to_string();
            let value = if SENSITIVE_HEADERS.contains(&name.as_str()) {
                "[redacted]".to_string()
            } else {
                value.to_str().unwrap_or("[binary]").to_string()
            };
            (name, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_are_redacted() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer secret"));
        headers.insert("x-access-token", HeaderValue::from_static("secret"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let sanitized = sanitized_headers(&headers);
        for (name, value) in &sanitized {
            if SENSITIVE_HEADERS.contains(&name.as_str()) {
                assert_eq!(value, "[redacted]");
            }
        }
        assert!(
            sanitized
                .iter()
                .any(|(n, v)| n == "content-type" && v == "application/json")
        );
    }
}
