//! Test doubles for the external collaborators: completion service,
//! embedding model, search, page fetch, trends and identity providers.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::auth::{AuthError, IdentityProvider, LoginRequest, Session};
use crate::llms::base_llm::{BaseLLM, LLMConfig, LLMError, LLMMessage};
use crate::rag::core::{BaseEmbedding, Embedding, RagError};
use crate::tools::base_tool::{BaseTool, ToolError, ToolInput};
use crate::tools::trends_tool::{RelatedQuery, TrendsProvider, TrendsReport};
use crate::tools::web_search_tool::{PageFetcher, SearchHit, SearchProvider};

// ---------------------------------------------------------------------------
// Completion service
// ---------------------------------------------------------------------------

/// Returns scripted responses in order and records every request.
#[derive(Debug, Default)]
pub struct ScriptedLLM {
    responses: Mutex<VecDeque<Result<String, LLMError>>>,
    calls: Mutex<Vec<Vec<LLMMessage>>>,
    delay: Option<Duration>,
}

impl ScriptedLLM {
    pub fn new(responses: Vec<Result<String, LLMError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before every response.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Vec<LLMMessage>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseLLM for ScriptedLLM {
    fn provider(&self) -> &str {
        "scripted"
    }

    async fn call(&self, messages: &[LLMMessage], _config: &LLMConfig) -> Result<String, LLMError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LLMError::Transport("no scripted response left".into())))
    }
}

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct EchoTool;

#[async_trait]
impl BaseTool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes the query back."
    }

    async fn execute(&self, input: &ToolInput) -> Result<String, ToolError> {
        Ok(format!("echo: {}", input.query))
    }
}

// ---------------------------------------------------------------------------
// Embeddings
// ---------------------------------------------------------------------------

const KEYWORD_DIMENSIONS: usize = 64;

/// Bag-of-words embedding over hashed lowercase words.
#[derive(Debug, Default)]
pub struct KeywordEmbedding;

impl KeywordEmbedding {
    fn embed(text: &str) -> Embedding {
        let mut vector = vec![0.0f32; KEYWORD_DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = word
                .to_lowercase()
                .bytes()
                .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
            vector[bucket as usize % KEYWORD_DIMENSIONS] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl BaseEmbedding for KeywordEmbedding {
    async fn embed_query(&self, text: &str) -> Result<Embedding, RagError> {
        Ok(Self::embed(text))
    }

    async fn embed_documents(&self, documents: &[String]) -> Result<Vec<Embedding>, RagError> {
        Ok(documents.iter().map(|d| Self::embed(d)).collect())
    }
}

#[derive(Debug, Default)]
pub struct FailingEmbedding;

#[async_trait]
impl BaseEmbedding for FailingEmbedding {
    async fn embed_query(&self, _text: &str) -> Result<Embedding, RagError> {
        Err(RagError::Embedding("embedding service unreachable".into()))
    }

    async fn embed_documents(&self, _documents: &[String]) -> Result<Vec<Embedding>, RagError> {
        Err(RagError::Embedding("embedding service unreachable".into()))
    }
}

// ---------------------------------------------------------------------------
// Search and pages
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct FakeSearch {
    hits: Vec<SearchHit>,
    fail: bool,
}

impl FakeSearch {
    pub fn with_hits(hits: Vec<(&str, Option<&str>)>) -> Self {
        Self {
            hits: hits
                .into_iter()
                .map(|(title, href)| SearchHit {
                    title: title.to_string(),
                    href: href.map(str::to_string),
                })
                .collect(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            hits: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<SearchHit>, ToolError> {
        if self.fail {
            return Err(ToolError::Provider("search backend returned 503".into()));
        }
        Ok(self.hits.iter().take(max_results).cloned().collect())
    }
}

/// Serves fixed HTML per URL; unknown URLs fail.
#[derive(Debug, Default)]
pub struct FakePages {
    pages: HashMap<String, String>,
}

impl FakePages {
    pub fn new(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(url, html)| (url.to_string(), html.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl PageFetcher for FakePages {
    async fn fetch(&self, url: &str) -> Result<String, ToolError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| ToolError::Provider(format!("failed to fetch {url}")))
    }
}

// ---------------------------------------------------------------------------
// Trends
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct FakeTrends {
    report: TrendsReport,
    fail: bool,
}

impl FakeTrends {
    pub fn with_queries(queries: &[&str]) -> Self {
        Self {
            report: TrendsReport {
                queries: queries
                    .iter()
                    .map(|q| RelatedQuery {
                        query: q.to_string(),
                        value: 100,
                    })
                    .collect(),
                topics: Vec::new(),
            },
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            report: TrendsReport::default(),
            fail: true,
        }
    }
}

#[async_trait]
impl TrendsProvider for FakeTrends {
    async fn related(&self, _keyword: &str) -> Result<TrendsReport, ToolError> {
        if self.fail {
            return Err(ToolError::Provider("trends returned 429".into()));
        }
        Ok(self.report.clone())
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Knows a fixed set of emails; any password is accepted.
#[derive(Debug, Default)]
pub struct FakeIdentity {
    users: Mutex<Vec<String>>,
}

impl FakeIdentity {
    pub fn with_users(emails: &[&str]) -> Self {
        Self {
            users: Mutex::new(emails.iter().map(|e| e.to_string()).collect()),
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn signup(&self, request: &LoginRequest) -> Result<(), AuthError> {
        self.users.lock().unwrap().push(request.email.clone());
        Ok(())
    }

    async fn login(&self, request: &LoginRequest) -> Result<Session, AuthError> {
        if !self.users.lock().unwrap().contains(&request.email) {
            return Err(AuthError::UserNotFound);
        }
        Ok(Session {
            access_token: format!("token-{}", request.email),
            user_id: format!("user-{}", request.email),
        })
    }

    async fn logout(&self, access_token: &str) -> Result<(), AuthError> {
        if access_token.starts_with("token-") {
            Ok(())
        } else {
            Err(AuthError::Rejected {
                status: 401,
                body: "invalid token".to_string(),
            })
        }
    }
}
