//! Base completion-service abstraction.
//!
//! Provides the trait every text-completion backend implements, the
//! per-agent call configuration (model, temperature, reasoning effort), and
//! the error type returned by failed calls.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default sampling temperature for agent calls.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Default reasoning effort hint for reasoning-capable models.
pub const DEFAULT_REASONING_EFFORT: &str = "medium";

// ---------------------------------------------------------------------------
// LLMMessage
// ---------------------------------------------------------------------------

/// A single message in a completion conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LLMMessage {
    /// Role of the message sender ("system", "user", "assistant").
    pub role: String,
    /// Content of the message.
    pub content: String,
}

impl LLMMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// LLMConfig
// ---------------------------------------------------------------------------

/// Completion parameters bound into every call an agent makes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Model identifier understood by the completion service.
    pub model: String,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Reasoning effort hint ("low", "medium", "high").
    #[serde(default)]
    pub reasoning_effort: Option<String>,
    /// Maximum tokens to generate.
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl LLMConfig {
    /// Create a config for `model` with the default temperature and
    /// reasoning effort.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: Some(DEFAULT_TEMPERATURE),
            reasoning_effort: Some(DEFAULT_REASONING_EFFORT.to_string()),
            max_tokens: None,
        }
    }

    /// Builder method to set the temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Builder method to set or clear the reasoning effort.
    pub fn with_reasoning_effort(mut self, effort: Option<String>) -> Self {
        self.reasoning_effort = effort;
        self
    }

    /// Apply per-agent overrides on top of this config.
    pub fn merged(&self, overrides: &LLMOverrides) -> Self {
        Self {
            model: overrides.model.clone().unwrap_or_else(|| self.model.clone()),
            temperature: overrides.temperature.or(self.temperature),
            reasoning_effort: overrides
                .reasoning_effort
                .clone()
                .or_else(|| self.reasoning_effort.clone()),
            max_tokens: overrides.max_tokens.or(self.max_tokens),
        }
    }
}

/// Optional per-agent overrides of the process-wide [`LLMConfig`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LLMOverrides {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub reasoning_effort: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

// ---------------------------------------------------------------------------
// LLMError
// ---------------------------------------------------------------------------

/// Failure of a completion call.
#[derive(Debug, Clone, Error)]
pub enum LLMError {
    /// No API key or endpoint configured.
    #[error("completion service is not configured: {0}")]
    NotConfigured(String),

    /// Network or transport failure.
    #[error("completion request failed: {0}")]
    Transport(String),

    /// Non-success status from the service.
    #[error("completion service returned {status}: {body}")]
    Api { status: u16, body: String },

    /// Response body did not have the expected shape.
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),

    /// The call exceeded its timeout.
    #[error("completion request timed out after {0:?}")]
    Timeout(Duration),
}

// ---------------------------------------------------------------------------
// BaseLLM trait
// ---------------------------------------------------------------------------

/// Trait for text-completion backends.
///
/// Implementations are opaque: they may be slow or fail, and every call
/// site is expected to handle `Err` without aborting the enclosing work.
#[async_trait]
pub trait BaseLLM: Send + Sync + fmt::Debug {
    /// Provider name used in logs.
    fn provider(&self) -> &str;

    /// Complete the conversation and return the assistant's text.
    async fn call(&self, messages: &[LLMMessage], config: &LLMConfig) -> Result<String, LLMError>;
}
