//! Query router: one constrained completion call picks the content pipeline
//! or the assistant.

use std::sync::Arc;

use crate::llms::base_llm::{BaseLLM, LLMConfig, LLMMessage};

const ROUTER_PROMPT: &str = "\
You are a routing expert. Decide whether the user message asks for a new blog \
post or article to be written ('content') or is a general question or \
conversation ('chat').\n\
Respond with one word only: content or chat.";

/// Where a request goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Run the content pipeline.
    Content,
    /// Answer with the conversational assistant.
    Chat,
}

impl Route {
    /// Parse a classifier reply. Accepts the legacy `crewai` / `langchain`
    /// labels as well.
    pub fn from_label(text: &str) -> Option<Self> {
        let word = text
            .split_whitespace()
            .next()?
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        match word.as_str() {
            "content" | "crewai" => Some(Route::Content),
            "chat" | "langchain" => Some(Route::Chat),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryRouter {
    llm: Arc<dyn BaseLLM>,
    config: LLMConfig,
}

impl QueryRouter {
    pub fn new(llm: Arc<dyn BaseLLM>, config: LLMConfig) -> Self {
        Self { llm, config }
    }

    /// Classify `query`. Any failure routes to the assistant.
    pub async fn route(&self, query: &str) -> Route {
        let messages = [
            LLMMessage::system(ROUTER_PROMPT),
            LLMMessage::user(format!("User: \"{query}\"\nResponse:")),
        ];
        match self.llm.call(&messages, &self.config).await {
            Ok(reply) => Route::from_label(&reply).unwrap_or_else(|| {
                log::warn!("Router returned unrecognised label {reply:?}; using the assistant");
                Route::Chat
            }),
            Err(e) => {
                log::error!("Router call failed: {e}; using the assistant");
                Route::Chat
            }
        }
    }
}
