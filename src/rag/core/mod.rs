//! Core abstractions for the retrieval subsystem.

use async_trait::async_trait;
use thiserror::Error;

pub use crate::rag::types::{BaseRecord, EmbeddedRecord, Embedding, SearchResult};

// ---------------------------------------------------------------------------
// RagError
// ---------------------------------------------------------------------------

/// Failure of an embedding or vector index call.
#[derive(Debug, Clone, Error)]
pub enum RagError {
    /// Missing API key, host or model.
    #[error("retrieval backend is not configured: {0}")]
    NotConfigured(String),

    /// Embedding request failed.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// Vector index request failed.
    #[error("vector index request failed: {0}")]
    Index(String),

    /// Response did not have the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

// ---------------------------------------------------------------------------
// BaseEmbedding trait
// ---------------------------------------------------------------------------

/// Trait for embedding models.
#[async_trait]
pub trait BaseEmbedding: Send + Sync + std::fmt::Debug {
    /// Embed a search query.
    async fn embed_query(&self, text: &str) -> Result<Embedding, RagError>;

    /// Embed documents for storage.
    async fn embed_documents(&self, documents: &[String]) -> Result<Vec<Embedding>, RagError>;
}

// ---------------------------------------------------------------------------
// VectorStore trait
// ---------------------------------------------------------------------------

/// Trait for vector index backends.
///
/// Results are ordered by descending score.
#[async_trait]
pub trait VectorStore: Send + Sync + std::fmt::Debug {
    /// Backend name used in logs.
    fn name(&self) -> &str;

    /// Return at most `top_k` nearest records to `vector`.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchResult>, RagError>;

    /// Insert or replace records.
    async fn upsert(&self, records: &[EmbeddedRecord]) -> Result<usize, RagError>;
}
