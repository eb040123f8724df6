//! Row types returned by store queries.

use sqlx::FromRow;
use uuid::Uuid;

/// One search hit: chunk fields joined with its owning document.
///
/// `distance` is the raw cosine distance reported by pgvector, in
/// `[0, 1]` for L2-normalized embeddings. Conversion to similarity is
/// the caller's concern.
#[derive(Clone, Debug, FromRow)]
pub struct ChunkHit {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub chunk_index: i32,
    pub content: String,
    pub section_title: Option<String>,
    pub document_title: Option<String>,
    pub source_file: Option<String>,
    pub distance: f32,
}

/// Result of a liveness ping against the store.
#[derive(Clone, Copy, Debug)]
pub struct StorePing {
    /// Round-trip latency of `SELECT 1` in milliseconds.
    pub latency_ms: u64,
}
