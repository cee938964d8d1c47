//! Pinecone vector index client.
//!
//! Talks to the index's data-plane host over REST (`/query`, `/vectors/upsert`).
//! Passage text lives in the `text` metadata field.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::rag::core::{EmbeddedRecord, RagError, SearchResult, VectorStore};
use crate::rag::types::TEXT_METADATA_KEY;

/// Vectors per upsert request.
const UPSERT_BATCH: usize = 100;

/// Pinecone index client.
#[derive(Debug, Clone)]
pub struct PineconeClient {
    /// Index host, e.g. `https://my-index-abc123.svc.us-east-1.pinecone.io`.
    host: String,
    /// API key sent in the `Api-Key` header.
    api_key: String,
    /// Optional namespace.
    namespace: Option<String>,
    client: reqwest::Client,
}

impl PineconeClient {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        let mut host = host.into().trim_end_matches('/').to_string();
        if !host.starts_with("http://") && !host.starts_with("https://") {
            host = format!("https://{host}");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            host,
            api_key: api_key.into(),
            namespace: None,
            client,
        }
    }

    /// Builder method to set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Build the body of a `/query` request.
    pub fn query_body(&self, vector: &[f32], top_k: usize) -> Value {
        let mut body = serde_json::json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
        });
        if let Some(ref ns) = self.namespace {
            body["namespace"] = serde_json::json!(ns);
        }
        body
    }

    /// Convert a `/query` response into search results.
    pub fn parse_matches(response: &Value) -> Result<Vec<SearchResult>, RagError> {
        let matches = response
            .get("matches")
            .and_then(|m| m.as_array())
            .ok_or_else(|| RagError::MalformedResponse("missing matches".to_string()))?;

        Ok(matches
            .iter()
            .filter_map(|m| {
                let id = m.get("id")?.as_str()?.to_string();
                let score = m.get("score").and_then(|s| s.as_f64()).unwrap_or(0.0);
                let mut metadata: HashMap<String, Value> = m
                    .get("metadata")
                    .and_then(|md| md.as_object())
                    .map(|o| o.clone().into_iter().collect())
                    .unwrap_or_default();
                let content = match metadata.remove(TEXT_METADATA_KEY) {
                    Some(Value::String(s)) => s,
                    _ => return None,
                };
                Some(SearchResult::new(id, content, metadata, score))
            })
            .collect())
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, RagError> {
        let response = self
            .client
            .post(format!("{}{path}", self.host))
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| RagError::Index(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RagError::Index(e.to_string()))?;
        if !status.is_success() {
            return Err(RagError::Index(format!("{status}: {text}")));
        }
        serde_json::from_str(&text).map_err(|e| RagError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl VectorStore for PineconeClient {
    fn name(&self) -> &str {
        "pinecone"
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchResult>, RagError> {
        log::debug!("Pinecone query: top_k={top_k}");
        let response = self.post("/query", &self.query_body(vector, top_k)).await?;
        Self::parse_matches(&response)
    }

    async fn upsert(&self, records: &[EmbeddedRecord]) -> Result<usize, RagError> {
        let mut total = 0;
        for batch in records.chunks(UPSERT_BATCH) {
            let vectors: Vec<Value> = batch
                .iter()
                .map(|r| {
                    let mut metadata = serde_json::Map::new();
                    for (k, v) in &r.metadata {
                        metadata.insert(k.clone(), v.clone());
                    }
                    metadata.insert(TEXT_METADATA_KEY.to_string(), Value::String(r.content.clone()));
                    serde_json::json!({ "id": r.id, "values": r.values, "metadata": metadata })
                })
                .collect();
            let mut body = serde_json::json!({ "vectors": vectors });
            if let Some(ref ns) = self.namespace {
                body["namespace"] = serde_json::json!(ns);
            }
            let response = self.post("/vectors/upsert", &body).await?;
            total += response
                .get("upsertedCount")
                .and_then(|c| c.as_u64())
                .map(|c| c as usize)
                .unwrap_or(batch.len());
        }
        log::info!("Pinecone upserted {total} vectors");
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_normalization() {
        let c = PineconeClient::new("idx.svc.pinecone.io/", "k");
        assert_eq!(c.host(), "https://idx.svc.pinecone.io");
    }

    #[test]
    fn test_query_body() {
        let c = PineconeClient::new("https://h", "k").with_namespace("blog");
        let body = c.query_body(&[0.1, 0.2], 5);
        assert_eq!(body["topK"], 5);
        assert_eq!(body["includeMetadata"], true);
        assert_eq!(body["namespace"], "blog");
    }

    #[test]
    fn test_parse_matches_skips_records_without_text() {
        let response = serde_json::json!({
            "matches": [
                {"id": "a", "score": 0.9, "metadata": {"text": "first", "source": "doc.pdf"}},
                {"id": "b", "score": 0.8, "metadata": {"source": "doc.pdf"}},
                {"id": "c", "score": 0.7}
            ]
        });
        let results = PineconeClient::parse_matches(&response).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "first");
        assert_eq!(results[0].metadata["source"], "doc.pdf");
    }

    #[test]
    fn test_parse_matches_malformed() {
        assert!(PineconeClient::parse_matches(&serde_json::json!({})).is_err());
    }
}
