//! Google Generative AI embedding provider.
//!
//! Calls the Generative Language REST API: `embedContent` for queries and
//! `batchEmbedContents` for documents.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rag::core::{BaseEmbedding, Embedding, RagError};

/// Default embedding model (768 dimensions).
pub const DEFAULT_EMBEDDING_MODEL: &str = "models/embedding-001";

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Maximum documents per batch request.
const MAX_BATCH: usize = 100;

/// Configuration for the Google embedding provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleEmbeddingConfig {
    /// Google API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Embedding model name, with or without the `models/` prefix.
    #[serde(default = "default_model")]
    pub model_name: String,
    /// Override for the API base URL.
    #[serde(default = "default_base")]
    pub base_url: String,
}

fn default_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_base() -> String {
    API_BASE.to_string()
}

impl Default for GoogleEmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model_name: default_model(),
            base_url: default_base(),
        }
    }
}

/// Google embedding client.
#[derive(Debug, Clone)]
pub struct GoogleEmbedding {
    config: GoogleEmbeddingConfig,
    client: reqwest::Client,
}

impl GoogleEmbedding {
    pub fn new(config: GoogleEmbeddingConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    /// Model name in `models/<id>` form.
    pub fn model_path(&self) -> String {
        if self.config.model_name.starts_with("models/") {
            self.config.model_name.clone()
        } else {
            format!("models/{}", self.config.model_name)
        }
    }

    fn api_key(&self) -> Result<&str, RagError> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| RagError::NotConfigured("GOOGLE_API_KEY not set".to_string()))
    }

    fn content_request(&self, text: &str, task_type: &str) -> Value {
        serde_json::json!({
            "model": self.model_path(),
            "content": { "parts": [{ "text": text }] },
            "taskType": task_type,
        })
    }

    async fn post(&self, method: &str, body: &Value) -> Result<Value, RagError> {
        let url = format!("{}/{}:{method}", self.config.base_url, self.model_path());
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key()?)])
            .json(body)
            .send()
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RagError::Embedding(e.to_string()))?;
        if !status.is_success() {
            return Err(RagError::Embedding(format!("{status}: {text}")));
        }
        serde_json::from_str(&text).map_err(|e| RagError::MalformedResponse(e.to_string()))
    }
}

/// Extract `values` from an `{"values": [...]}` object.
fn parse_values(embedding: &Value) -> Result<Embedding, RagError> {
    embedding
        .get("values")
        .and_then(|v| v.as_array())
        .map(|values| {
            values
                .iter()
                .filter_map(|x| x.as_f64().map(|f| f as f32))
                .collect()
        })
        .ok_or_else(|| RagError::MalformedResponse("missing embedding values".to_string()))
}

#[async_trait]
impl BaseEmbedding for GoogleEmbedding {
    async fn embed_query(&self, text: &str) -> Result<Embedding, RagError> {
        let body = self.content_request(text, "RETRIEVAL_QUERY");
        let response = self.post("embedContent", &body).await?;
        let embedding = response
            .get("embedding")
            .ok_or_else(|| RagError::MalformedResponse("missing embedding".to_string()))?;
        parse_values(embedding)
    }

    async fn embed_documents(&self, documents: &[String]) -> Result<Vec<Embedding>, RagError> {
        let mut out = Vec::with_capacity(documents.len());
        for batch in documents.chunks(MAX_BATCH) {
            let requests: Vec<Value> = batch
                .iter()
                .map(|d| self.content_request(d, "RETRIEVAL_DOCUMENT"))
                .collect();
            let response = self
                .post("batchEmbedContents", &serde_json::json!({ "requests": requests }))
                .await?;
            let embeddings = response
                .get("embeddings")
                .and_then(|e| e.as_array())
                .ok_or_else(|| RagError::MalformedResponse("missing embeddings".to_string()))?;
            for embedding in embeddings {
                out.push(parse_values(embedding)?);
            }
        }
        log::debug!("Embedded {} documents with {}", out.len(), self.model_path());
        Ok(out)
    }
}
