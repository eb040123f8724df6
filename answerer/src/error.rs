//! Typed error for the answer pipeline.

use thiserror::Error;

use kb_store::KbError;
use llm_service::LlmError;

#[derive(Debug, Error)]
pub enum AnswerError {
    /// The embedding provider failed while embedding the query.
    #[error("embedding provider error: {0}")]
    Embedder(#[source] LlmError),

    /// The knowledge-base store failed.
    #[error("knowledge-base store error: {0}")]
    Store(#[from] KbError),

    /// The completion provider failed before or during streaming.
    #[error("completion provider error: {0}")]
    Llm(#[source] LlmError),

    /// A bounded wait expired.
    #[error("{operation} timed out after {limit_secs}s")]
    Timeout {
        operation: &'static str,
        limit_secs: u64,
    },
}

impl AnswerError {
    /// True when the underlying provider rejected the answer through
    /// its content filter.
    pub fn is_content_filtered(&self) -> bool {
        matches!(
            self,
            AnswerError::Llm(LlmError::ContentFiltered) | AnswerError::Embedder(LlmError::ContentFiltered)
        )
    }

    /// True when a dependency is unreachable (as opposed to a broken
    /// exchange or an expired bound).
    pub fn is_unavailable(&self) -> bool {
        match self {
            AnswerError::Embedder(e) | AnswerError::Llm(e) => e.is_unavailable(),
            _ => false,
        }
    }
}
