//! Type definitions for the retrieval subsystem.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Metadata key under which passage text is stored in the vector index.
pub const TEXT_METADATA_KEY: &str = "text";

/// Type alias for a single embedding vector.
pub type Embedding = Vec<f32>;

/// A document record for storage in a vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseRecord {
    /// Optional unique identifier for the document.
    /// If not provided, a content-based ID is generated with SHA-256.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    /// The text content of the document (required).
    pub content: String,
    /// Optional metadata associated with the document.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl BaseRecord {
    /// Create a new record with only content.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            doc_id: None,
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    /// Set metadata for this record.
    pub fn with_metadata(mut self, metadata: HashMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Get or generate the document ID.
    pub fn get_or_generate_id(&self) -> String {
        match &self.doc_id {
            Some(id) => id.clone(),
            None => {
                let digest = Sha256::digest(self.content.as_bytes());
                hex::encode(digest)
            }
        }
    }
}

/// A record paired with its embedding, ready for upsert.
#[derive(Debug, Clone)]
pub struct EmbeddedRecord {
    pub id: String,
    pub values: Embedding,
    pub content: String,
    pub metadata: HashMap<String, Value>,
}

/// Standard search result format for vector store queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Unique identifier of the document.
    pub id: String,
    /// The text content of the document.
    pub content: String,
    /// Metadata associated with the document.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    /// Similarity score (higher is better).
    pub score: f64,
}

impl SearchResult {
    pub fn new(id: String, content: String, metadata: HashMap<String, Value>, score: f64) -> Self {
        Self {
            id,
            content,
            metadata,
            score,
        }
    }
}
