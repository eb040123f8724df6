//! Retrieval-only API: ranked passages from the vector store.
//!
//! This mirrors the first half of the chat pipeline but stops after
//! similarity filtering, returning passages for direct serialization.

use tracing::{debug, info};
use uuid::Uuid;

use kb_store::{ChunkHit, KbStore};
use llm_service::LlmError;

use crate::api_types::RetrievedPassage;
use crate::embed::Embedder;
use crate::error::AnswerError;
use crate::timeouts::{self, bounded};

/// Options controlling one search. Bounds are enforced upstream by the
/// request validator.
#[derive(Clone, Copy, Debug)]
pub struct SearchParams {
    /// Maximum number of passages to return.
    pub top_k: u32,
    /// Similarity floor in `[0, 1]`; weaker hits are dropped.
    pub min_similarity: f32,
    /// Optional restriction to one document.
    pub document_id: Option<Uuid>,
}

/// Converts the store's cosine distance to similarity, clamped to `[0, 1]`.
pub fn similarity_from_distance(distance: f32) -> f32 {
    (1.0 - distance).clamp(0.0, 1.0)
}

/// Retrieves the ranked passages for a query.
///
/// Workflow:
/// 1. Embed the query text (embedding bound).
/// 2. Top-K cosine search against the store (database bound).
/// 3. Convert distances to similarities and apply the floor. The
///    store's ordering is preserved; the pipeline never reorders.
///
/// An empty result is a successful retrieval.
///
/// # Errors
/// - [`AnswerError::Embedder`] when the embedding provider fails
/// - [`AnswerError::Store`] when the store fails
/// - [`AnswerError::Timeout`] when either bound expires
pub async fn search_passages(
    store: &KbStore,
    embedder: &dyn Embedder,
    query: &str,
    params: &SearchParams,
) -> Result<Vec<RetrievedPassage>, AnswerError> {
    info!(top_k = params.top_k, min_similarity = params.min_similarity, "embedding query");

    let inputs = [query.to_string()];
    let vectors = bounded(
        "embedding generation",
        timeouts::EMBEDDING,
        embedder.embed_batch(&inputs),
    )
    .await?
    .map_err(AnswerError::Embedder)?;

    let query_vector = vectors
        .into_iter()
        .next()
        .ok_or_else(|| AnswerError::Embedder(LlmError::Decode("empty embedding batch".into())))?;

    let hits = bounded(
        "database read",
        timeouts::DB_READ,
        store.search(&query_vector, params.top_k, params.document_id),
    )
    .await??;

    let passages = rank_hits(hits, params.min_similarity);
    debug!(passages = passages.len(), "retrieval completed");
    Ok(passages)
}

/// Maps raw hits to passages and drops entries below the floor,
/// preserving the store's best-first order.
pub(crate) fn rank_hits(hits: Vec<ChunkHit>, min_similarity: f32) -> Vec<RetrievedPassage> {
    hits.into_iter()
        .map(|hit| RetrievedPassage {
            chunk_id: hit.chunk_id,
            document_id: hit.document_id,
            content: hit.content,
            section_title: hit.section_title,
            source_file: hit.source_file,
            document_title: hit.document_title,
            similarity: similarity_from_distance(hit.distance),
        })
        .filter(|p| p.similarity >= min_similarity)
        .collect()
}
