//! OpenAI-compatible chat completions provider.
//!
//! Speaks the `/chat/completions` wire format, which Groq and most hosted
//! inference services expose. Defaults to the Groq endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::llms::base_llm::{BaseLLM, LLMConfig, LLMError, LLMMessage};

/// Default base URL for the hosted completion service.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Chat completions client for OpenAI-compatible endpoints.
#[derive(Debug, Clone)]
pub struct OpenAICompletion {
    /// API key sent as a bearer token.
    api_key: Option<String>,
    /// Base URL without trailing `/chat/completions`.
    base_url: String,
    /// Per-request timeout.
    timeout: Duration,
    /// Retries after the first attempt for 429 / 5xx / transport errors.
    pub max_retries: u32,
    /// Delay before the first retry; doubled on each subsequent one.
    pub initial_backoff: Duration,
    /// Shared HTTP client.
    client: reqwest::Client,
}

impl OpenAICompletion {
    /// Create a new provider.
    ///
    /// `base_url` defaults to [`DEFAULT_BASE_URL`].
    pub fn new(api_key: Option<String>, base_url: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout,
            max_retries: 2,
            initial_backoff: Duration::from_secs(1),
            client,
        }
    }

    /// Endpoint the provider posts to.
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Whether an API key is available.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Build the request body for the Chat Completions API.
    pub fn build_request_body(&self, messages: &[LLMMessage], config: &LLMConfig) -> Value {
        let mut body = serde_json::json!({
            "model": config.model,
            "messages": messages,
        });

        if let Some(temp) = config.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        if let Some(max_tokens) = config.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if let Some(ref effort) = config.reasoning_effort {
            body["reasoning_effort"] = serde_json::json!(effort);
        }

        body
    }

    /// Extract the assistant text from a Chat Completions response.
    pub fn parse_completions_response(response: &Value) -> Result<String, LLMError> {
        let message = response
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .ok_or_else(|| LLMError::MalformedResponse("no choices in response".to_string()))?;

        if let Some(usage) = response.get("usage") {
            log::debug!(
                "Token usage: prompt={}, completion={}, total={}",
                usage.get("prompt_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
                usage.get("completion_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
                usage.get("total_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
            );
        }

        match message.get("content") {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Null) | None => Ok(String::new()),
            Some(other) => Err(LLMError::MalformedResponse(format!(
                "unexpected content type: {other}"
            ))),
        }
    }
}

#[async_trait]
impl BaseLLM for OpenAICompletion {
    fn provider(&self) -> &str {
        "openai-compatible"
    }

    async fn call(&self, messages: &[LLMMessage], config: &LLMConfig) -> Result<String, LLMError> {
        log::debug!(
            "OpenAICompletion.call: model={}, messages={}",
            config.model,
            messages.len(),
        );

        let api_key = self.api_key.as_ref().ok_or_else(|| {
            LLMError::NotConfigured("API key not set; set LLM_API_KEY".to_string())
        })?;

        let body = self.build_request_body(messages, config);
        let endpoint = self.endpoint();

        let mut last_error: Option<LLMError> = None;
        let mut retry_delay = self.initial_backoff;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                log::warn!("Completion retry attempt {attempt} after {retry_delay:?}");
                tokio::time::sleep(retry_delay).await;
                retry_delay *= 2;
            }

            let response = match self
                .client
                .post(&endpoint)
                .bearer_auth(api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) if e.is_timeout() => {
                    last_error = Some(LLMError::Timeout(self.timeout));
                    continue;
                }
                Err(e) => {
                    last_error = Some(LLMError::Transport(e.to_string()));
                    continue;
                }
            };

            let status = response.status();
            let response_text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    last_error = Some(LLMError::Transport(e.to_string()));
                    continue;
                }
            };

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                last_error = Some(LLMError::Api {
                    status: status.as_u16(),
                    body: truncate(&response_text, 500),
                });
                continue;
            }

            if !status.is_success() {
                return Err(LLMError::Api {
                    status: status.as_u16(),
                    body: truncate(&response_text, 500),
                });
            }

            let response_json: Value = serde_json::from_str(&response_text).map_err(|e| {
                LLMError::MalformedResponse(format!(
                    "{e} - Body: {}",
                    truncate(&response_text, 500)
                ))
            })?;

            return Self::parse_completions_response(&response_json);
        }

        Err(last_error
            .unwrap_or_else(|| LLMError::Transport("call failed after all retries".to_string())))
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
