//! Cache and CORS headers stamped on every response.
//!
//! All responses are private and uncacheable. The CORS allow-origin
//! echoes the request origin iff it is allowlisted; any other origin
//! gets the first configured one. This rule is not expressible with a
//! stock CORS layer, hence the hand-written middleware.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request, header};
use axum::middleware::Next;
use axum::response::Response;

use crate::core::app_state::AppState;

pub async fn response_headers(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate, private"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));

    let allow = allow_origin(&state.config.allowed_origins, origin.as_deref());
    if let Ok(value) = HeaderValue::from_str(allow) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization, X-Access-Token"),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static("86400"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));

    response
}

/// Picks the allow-origin value: the request origin when allowlisted,
/// otherwise the first configured origin.
pub fn allow_origin<'a>(allowlist: &'a [String], origin: Option<&'a str>) -> &'a str {
    match origin {
        Some(o) if allowlist.iter().any(|allowed| allowed == o) => o,
        _ => allowlist
            .first()
            .map(String::as_str)
            .unwrap_or("http://localhost:3000"),
    }
}
