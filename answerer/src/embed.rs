//! Provider interface for query embedding.

use std::{future::Future, pin::Pin};

use llm_service::{LlmClient, LlmError};

/// Asynchronous embedding provider.
///
/// Implement this trait to plug in another embedding backend; the
/// production implementation is [`LlmClient`].
pub trait Embedder: Send + Sync {
    /// Embeds a batch of inputs, one 1536-float vector per input, in
    /// input order.
    fn embed_batch<'a>(
        &'a self,
        texts: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>, LlmError>> + Send + 'a>>;
}

impl Embedder for LlmClient {
    fn embed_batch<'a>(
        &'a self,
        texts: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>, LlmError>> + Send + 'a>> {
        Box::pin(LlmClient::embed_batch(self, texts))
    }
}
