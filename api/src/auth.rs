//! Bearer-token extraction and constant-time credential comparison.
//!
//! Token sources, in order: `Authorization: Bearer <token>`, then the
//! `X-Access-Token` header. An `Authorization` header that is present,
//! non-empty, and not a Bearer scheme is malformed unless the fallback
//! header rescues the request.

use axum::http::{HeaderMap, header};

/// Why authentication failed; surfaced as `details.reason`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuthFailure {
    TokenMissing,
    TokenInvalid,
    TokenMalformed,
}

impl AuthFailure {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthFailure::TokenMissing => "token_missing",
            AuthFailure::TokenInvalid => "token_invalid",
            AuthFailure::TokenMalformed => "token_malformed",
        }
    }
}

/// Extracts the presented token without judging its value.
pub fn extract_token(headers: &HeaderMap) -> Result<String, AuthFailure> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let fallback = headers
        .get("x-access-token")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    if let Some(raw) = authorization {
        if let Some(token) = raw.strip_prefix("Bearer ") {
            return Ok(token.to_string());
        }
        if !raw.is_empty() && fallback.is_none() {
            return Err(AuthFailure::TokenMalformed);
        }
    }

    match fallback {
        Some(token) => Ok(token.to_string()),
        None => Err(AuthFailure::TokenMissing),
    }
}

/// Extracts and verifies the token against the configured secret,
/// returning the token value (used as the rate-limit key) on success.
pub fn require_token(headers: &HeaderMap, secret: &str) -> Result<String, AuthFailure> {
    let token = extract_token(headers)?;
    if constant_time_eq(token.as_bytes(), secret.as_bytes()) {
        Ok(token)
    } else {
        Err(AuthFailure::TokenInvalid)
    }
}

/// Equality over `max(len(a), len(b))` bytes, accumulating differences
/// so a mismatch never short-circuits the loop. A length mismatch is
/// folded into the accumulator and reported only after the full scan.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let len = a.len().max(b.len());
    let mut diff = a.len() ^ b.len();
    for i in 0..len {
        let x = *a.get(i).unwrap_or(&0);
        let y = *b.get(i).unwrap_or(&0);
        diff |= usize::from(x ^ y);
    }
    diff == 0
}
