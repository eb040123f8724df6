//! Hard upper bounds for every outbound await.
//!
//! A timeout is reported as [`AnswerError::Timeout`], distinct from
//! dependency failures, so the HTTP boundary can map it to 504.

use std::future::Future;
use std::time::Duration;

use crate::error::AnswerError;

/// Database read bound.
pub const DB_READ: Duration = Duration::from_secs(5);
/// Embedding generation bound.
pub const EMBEDDING: Duration = Duration::from_secs(10);
/// Full (collected) completion bound.
pub const LLM_COMPLETION: Duration = Duration::from_secs(30);
/// Maximum idle gap between streamed fragments.
pub const LLM_STREAM_IDLE: Duration = Duration::from_secs(60);

/// Awaits `fut` under `limit`, naming the operation in the timeout error.
pub async fn bounded<T, F>(operation: &'static str, limit: Duration, fut: F) -> Result<T, AnswerError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| AnswerError::Timeout {
            operation,
            limit_secs: limit.as_secs(),
        })
}
