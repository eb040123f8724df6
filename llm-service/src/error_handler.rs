//! Typed errors for the LLM client.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors produced by [`crate::LlmClient`].
#[derive(Debug, Error)]
pub enum LlmError {
    /// API key is missing in the config.
    #[error("missing API key in LlmConfig::api_key")]
    MissingApiKey,

    /// Invalid endpoint (empty or missing http/https).
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Transport/HTTP client error.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-successful HTTP status from upstream.
    #[error("unexpected HTTP status {status} from {url}")]
    HttpStatus { status: StatusCode, url: String },

    /// Unexpected/invalid JSON or SSE payload.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The provider rejected the request through its content filter.
    #[error("completion stopped by the provider content filter")]
    ContentFiltered,
}

impl LlmError {
    /// True when the failure indicates the provider is unreachable or
    /// shedding load, as opposed to a malformed exchange.
    pub fn is_unavailable(&self) -> bool {
        match self {
            LlmError::Transport(e) => e.is_connect() || e.is_timeout(),
            LlmError::HttpStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}
