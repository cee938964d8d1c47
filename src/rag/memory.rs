//! In-process vector store using cosine similarity.
//!
//! Used when no hosted index is configured.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::rag::core::{EmbeddedRecord, RagError, SearchResult, VectorStore};

#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    records: RwLock<HashMap<String, EmbeddedRecord>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cosine similarity; zero when either vector has no magnitude or the
/// dimensions differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut na, mut nb) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchResult>, RagError> {
        let records = self
            .records
            .read()
            .map_err(|e| RagError::Index(e.to_string()))?;
        let mut results: Vec<SearchResult> = records
            .values()
            .map(|r| {
                SearchResult::new(
                    r.id.clone(),
                    r.content.clone(),
                    r.metadata.clone(),
                    cosine_similarity(vector, &r.values),
                )
            })
            .collect();
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        results.truncate(top_k);
        Ok(results)
    }

    async fn upsert(&self, records: &[EmbeddedRecord]) -> Result<usize, RagError> {
        let mut store = self
            .records
            .write()
            .map_err(|e| RagError::Index(e.to_string()))?;
        for r in records {
            store.insert(r.id.clone(), r.clone());
        }
        Ok(records.len())
    }
}
