//! Data returned to callers of the pipeline.

use serde::Serialize;
use uuid::Uuid;

/// One ranked passage: chunk content joined with its owning document,
/// with cosine similarity in `[0, 1]` (1.0 means identical direction).
#[derive(Clone, Debug, Serialize)]
pub struct RetrievedPassage {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub content: String,
    pub section_title: Option<String>,
    pub source_file: Option<String>,
    pub document_title: Option<String>,
    pub similarity: f32,
}
