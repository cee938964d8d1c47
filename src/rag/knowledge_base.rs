//! Knowledge base: embedding model + vector store behind one retrieval call.
//!
//! `retrieve` never fails. Backend errors and zero-hit queries come back as
//! explicit [`Retrieval`] variants so callers can continue with degraded
//! context.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::rag::core::{BaseEmbedding, BaseRecord, EmbeddedRecord, RagError, SearchResult, VectorStore};
use crate::rag::splitter::TextSplitter;

/// Default number of passages returned per query.
pub const DEFAULT_TOP_K: usize = 5;

/// Outcome of a retrieval.
#[derive(Debug, Clone)]
pub enum Retrieval {
    /// Ordered passages, most similar first. Never empty.
    Passages(Vec<SearchResult>),
    /// The index answered but nothing matched.
    NoRelevantInformation,
    /// The embedding model or index could not be reached.
    Unavailable(RagError),
}

impl Retrieval {
    /// Passage texts joined by blank lines, or `None` when degraded.
    pub fn context_text(&self) -> Option<String> {
        match self {
            Retrieval::Passages(passages) => Some(
                passages
                    .iter()
                    .map(|p| p.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n\n"),
            ),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    embedder: Arc<dyn BaseEmbedding>,
    store: Arc<dyn VectorStore>,
    splitter: TextSplitter,
}

impl KnowledgeBase {
    pub fn new(embedder: Arc<dyn BaseEmbedding>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            splitter: TextSplitter::default(),
        }
    }

    /// Builder method to set the ingestion splitter.
    pub fn with_splitter(mut self, splitter: TextSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    /// Return the top `k` passages for `query`.
    pub async fn retrieve(&self, query: &str, k: usize) -> Retrieval {
        if query.trim().is_empty() || k == 0 {
            return Retrieval::NoRelevantInformation;
        }
        let vector = match self.embedder.embed_query(query).await {
            Ok(v) => v,
            Err(e) => {
                log::error!("Knowledge base: embedding failed for '{query}': {e}");
                return Retrieval::Unavailable(e);
            }
        };
        match self.store.query(&vector, k).await {
            Ok(results) => {
                let passages: Vec<SearchResult> = results
                    .into_iter()
                    .filter(|r| !r.content.trim().is_empty())
                    .collect();
                if passages.is_empty() {
                    log::warn!("Knowledge base: no relevant information for '{query}'");
                    Retrieval::NoRelevantInformation
                } else {
                    log::info!(
                        "Knowledge base: retrieved {} passages from {}",
                        passages.len(),
                        self.store.name()
                    );
                    Retrieval::Passages(passages)
                }
            }
            Err(e) => {
                log::error!("Knowledge base: {} query failed: {e}", self.store.name());
                Retrieval::Unavailable(e)
            }
        }
    }

    /// Split, embed and upsert documents. Returns the number of chunks stored.
    pub async fn ingest(
        &self,
        texts: &[String],
        metadata: &HashMap<String, Value>,
    ) -> Result<usize, RagError> {
        let records: Vec<BaseRecord> = texts
            .iter()
            .flat_map(|t| self.splitter.split_text(t))
            .map(|chunk| BaseRecord::new(chunk).with_metadata(metadata.clone()))
            .collect();
        if records.is_empty() {
            return Ok(0);
        }

        let contents: Vec<String> = records.iter().map(|r| r.content.clone()).collect();
        let vectors = self.embedder.embed_documents(&contents).await?;
        if vectors.len() != records.len() {
            return Err(RagError::Embedding(format!(
                "expected {} embeddings, got {}",
                records.len(),
                vectors.len()
            )));
        }

        let embedded: Vec<EmbeddedRecord> = records
            .into_iter()
            .zip(vectors)
            .map(|(r, values)| EmbeddedRecord {
                id: r.get_or_generate_id(),
                values,
                content: r.content,
                metadata: r.metadata,
            })
            .collect();
        log::info!("Knowledge base: ingesting {} chunks", embedded.len());
        self.store.upsert(&embedded).await
    }
}
