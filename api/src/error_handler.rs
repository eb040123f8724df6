//! Public application error type and the canonical response shape.
//!
//! Every failure is rendered as
//! `{"error":{"code","message","details"?},"requestId"}` with a stable
//! machine-readable code. Messages stay generic: no token material,
//! stack frames, or dependency payloads ever reach a response.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{error, warn};

use answerer::AnswerError;

use crate::auth::AuthFailure;

/// Handy result alias used across handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// One field-level validation problem, listed under `details.errors`.
#[derive(Clone, Debug, Serialize)]
pub struct FieldIssue {
    /// Field path like `messages[2].content`.
    pub path: String,
    /// Human-friendly description of the problem.
    pub message: String,
}

impl FieldIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Public application error type.
#[derive(Debug, Error)]
pub enum ApiError {
    // --- Caller errors (4xx) ---
    #[error("authentication failed")]
    Unauthorized { reason: AuthFailure },

    #[error("request body could not be decoded")]
    BadRequest { message: String },

    #[error("request validation failed")]
    Validation { errors: Vec<FieldIssue> },

    #[error("request text matched a known prompt-injection pattern")]
    SuspiciousInput,

    #[error("the provider filtered this completion")]
    ContentFiltered,

    #[error("request body exceeds the allowed size")]
    PayloadTooLarge,

    #[error("rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    #[error("not found")]
    NotFound,

    // --- Dependency errors (5xx) ---
    #[error("{dependency} is unavailable")]
    ServiceUnavailable { dependency: &'static str },

    #[error("{operation} timed out")]
    GatewayTimeout { operation: &'static str },

    // --- Programming errors (5xx) ---
    #[error("internal error")]
    Internal,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Validation { .. }
            | ApiError::SuspiciousInput
            | ApiError::ContentFiltered => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::GatewayTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized { .. } => "unauthorized",
            ApiError::BadRequest { .. } => "bad_request",
            ApiError::Validation { .. }
            | ApiError::SuspiciousInput
            | ApiError::ContentFiltered => "validation_failed",
            ApiError::PayloadTooLarge => "payload_too_large",
            ApiError::RateLimited { .. } => "rate_limit_exceeded",
            ApiError::NotFound => "not_found",
            ApiError::ServiceUnavailable { .. } => "service_unavailable",
            ApiError::GatewayTimeout { .. } => "gateway_timeout",
            ApiError::Internal => "internal_error",
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            ApiError::Unauthorized { reason } => Some(json!({ "reason": reason.as_str() })),
            ApiError::BadRequest { message } => Some(json!({ "reason": message })),
            ApiError::Validation { errors } => Some(json!({ "errors": errors })),
            ApiError::SuspiciousInput => Some(json!({ "reason": "suspicious_input" })),
            ApiError::ContentFiltered => Some(json!({ "reason": "content_filtered" })),
            ApiError::PayloadTooLarge => {
                Some(json!({ "max_bytes": crate::routes::MAX_BODY_BYTES }))
            }
            ApiError::RateLimited { retry_after_secs } => {
                Some(json!({ "retry_after_seconds": retry_after_secs }))
            }
            _ => None,
        }
    }

    /// Logs the failure per its taxonomic category: caller errors at
    /// warn without detail, dependency errors at error with the
    /// collaborator name, programming errors at error.
    pub fn log(&self, request_id: &str) {
        match self {
            ApiError::ServiceUnavailable { dependency } => {
                error!(request_id, dependency, "dependency unavailable");
            }
            ApiError::GatewayTimeout { operation } => {
                error!(request_id, operation, "bounded wait expired");
            }
            ApiError::Internal => {
                error!(request_id, "internal error");
            }
            other => {
                warn!(request_id, code = other.error_code(), "request rejected");
            }
        }
    }

    /// Renders the canonical error response, carrying the request id.
    pub fn respond(&self, request_id: &str) -> Response {
        let mut error = serde_json::Map::new();
        error.insert("code".into(), json!(self.error_code()));
        error.insert("message".into(), json!(self.to_string()));
        if let Some(details) = self.details() {
            error.insert("details".into(), details);
        }
        let body = json!({
            "error": error,
            "requestId": request_id,
        });

        let mut response = (self.status_code(), Json(body)).into_response();
        if let ApiError::RateLimited { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<AuthFailure> for ApiError {
    fn from(reason: AuthFailure) -> Self {
        ApiError::Unauthorized { reason }
    }
}

impl From<AnswerError> for ApiError {
    fn from(err: AnswerError) -> Self {
        if err.is_content_filtered() {
            return ApiError::ContentFiltered;
        }
        match err {
            AnswerError::Timeout { operation, .. } => ApiError::GatewayTimeout { operation },
            AnswerError::Embedder(e) => {
                if e.is_unavailable() {
                    ApiError::ServiceUnavailable {
                        dependency: "embedding provider",
                    }
                } else {
                    ApiError::Internal
                }
            }
            AnswerError::Llm(e) => {
                if e.is_unavailable() {
                    ApiError::ServiceUnavailable {
                        dependency: "model provider",
                    }
                } else {
                    ApiError::Internal
                }
            }
            AnswerError::Store(_) => ApiError::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_statuses() {
        let cases = [
            (
                ApiError::Unauthorized {
                    reason: AuthFailure::TokenMissing,
                },
                StatusCode::UNAUTHORIZED,
                "unauthorized",
            ),
            (
                ApiError::PayloadTooLarge,
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
            ),
            (
                ApiError::RateLimited {
                    retry_after_secs: 3,
                },
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limit_exceeded",
            ),
            (
                ApiError::GatewayTimeout {
                    operation: "database read",
                },
                StatusCode::GATEWAY_TIMEOUT,
                "gateway_timeout",
            ),
            (
                ApiError::Internal,
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
            ),
        ];

        for (err, status, code) in cases {
            assert_eq!(err.status_code(), status);
            assert_eq!(err.error_code(), code);
        }
    }

    #[test]
    fn rate_limited_response_sets_retry_after() {
        let response = ApiError::RateLimited {
            retry_after_secs: 17,
        }
        .respond("req-1");

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            &HeaderValue::from_static("17")
        );
    }

    #[test]
    fn content_filter_maps_to_validation_failed() {
        let err = ApiError::from(AnswerError::Llm(llm_service::LlmError::ContentFiltered));
        assert_eq!(err.error_code(), "validation_failed");
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
