//! Thin adapter around `sqlx`/Postgres to isolate SQL usage.
//!
//! This facade concentrates all database interactions behind a small
//! API so the rest of the code stays decoupled from the schema.

use std::time::Instant;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::{EMBEDDING_DIM, KbConfig};
use crate::errors::KbError;
use crate::models::{ChunkHit, StorePing};

const SEARCH_SQL: &str = "\
SELECT c.id AS chunk_id,
       c.document_id,
       c.chunk_index,
       c.content,
       c.section_title,
       d.title AS document_title,
       d.source_file,
       (c.embedding <=> $1::vector)::float4 AS distance
FROM chunks c
JOIN documents d ON d.id = c.document_id
WHERE c.embedding IS NOT NULL
  AND ($2::uuid IS NULL OR c.document_id = $2)
ORDER BY c.embedding <=> $1::vector
LIMIT $3";

/// A minimal facade over the Postgres pool to keep the rest of the code decoupled.
pub struct KbStore {
    pool: PgPool,
}

impl KbStore {
    /// Connects a pool using the given configuration.
    ///
    /// # Errors
    /// Returns `KbError::Config` for invalid cfg, `KbError::Db` if the
    /// pool cannot be established.
    pub async fn connect(cfg: &KbConfig) -> Result<Self, KbError> {
        cfg.validate()?;

        let pool = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .connect(&cfg.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Performs a cosine-distance search and returns hits ordered by
    /// ascending distance (best match first).
    ///
    /// Chunks without an embedding never appear in the result. The
    /// optional `document_id` restricts the search to one document.
    ///
    /// # Errors
    /// Returns `KbError::VectorSizeMismatch` if the query vector does
    /// not match the indexed width, `KbError::Db` on query failures.
    pub async fn search(
        &self,
        query_vector: &[f32],
        top_k: u32,
        document_id: Option<Uuid>,
    ) -> Result<Vec<ChunkHit>, KbError> {
        if query_vector.len() != EMBEDDING_DIM {
            return Err(KbError::VectorSizeMismatch {
                got: query_vector.len(),
                want: EMBEDDING_DIM,
            });
        }
        trace!(top_k, filtered = document_id.is_some(), "kb_store::search");

        let hits = sqlx::query_as::<_, ChunkHit>(SEARCH_SQL)
            .bind(vector_literal(query_vector))
            .bind(document_id)
            .bind(i64::from(top_k))
            .fetch_all(&self.pool)
            .await?;

        debug!(hits = hits.len(), "kb_store::search completed");
        Ok(hits)
    }

    /// Executes `SELECT 1` and reports the round-trip latency.
    ///
    /// # Errors
    /// Returns `KbError::Db` if the store is unreachable.
    pub async fn ping(&self) -> Result<StorePing, KbError> {
        let started = Instant::now();
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(StorePing {
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Checks whether the `vector` extension is installed.
    ///
    /// # Errors
    /// Returns `KbError::Db` on query failures.
    pub async fn has_vector_extension(&self) -> Result<bool, KbError> {
        let present = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM pg_extension WHERE extname = 'vector')",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(present)
    }
}

/// Renders a pgvector literal like `[0.1,0.2,...]` for a `$n::vector` bind.
fn vector_literal(v: &[f32]) -> String {
    let mut out = String::with_capacity(v.len() * 10 + 2);
    out.push('[');
    for (i, x) in v.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&x.to_string());
    }
    out.push(']');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_literal_renders_brackets_and_commas() {
        assert_eq!(vector_literal(&[1.0, -0.5, 0.25]), "[1,-0.5,0.25]");
        assert_eq!(vector_literal(&[]), "[]");
    }
}
