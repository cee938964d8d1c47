//! Single-turn support assistant for Mindtype.
//!
//! Each turn optionally carries passages from the knowledge base. Retrieval
//! degradation never fails the turn; the prompt just gets an empty context.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::chat::session::OffTopicTracker;
use crate::llms::base_llm::{BaseLLM, LLMConfig, LLMError, LLMMessage};
use crate::rag::knowledge_base::{KnowledgeBase, Retrieval, DEFAULT_TOP_K};

/// Tag the model puts in front of replies to unrelated questions.
pub const OFF_TOPIC_MARKER: &str = "[off-topic]";

static OFF_TOPIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s*\[off[- ]topic\]\s*").unwrap());

const PERSONA: &str = "\
You are the official support assistant for Mindtype, a company founded by \
DirectEd scholars that publishes high-quality blog posts and content.\n\
Blog generation is handled by a dedicated agent team; you handle general \
questions, company information and navigation.\n\
Keep replies brief and chat-like: 1 to 3 short sentences, professional and \
concise, no repeated greetings. Use the context only when it helps; do not \
dump it.\n\
If the question is unrelated to Mindtype, its content or the company, start \
your reply with [off-topic] and still answer briefly.";

const REMINDER: &str = "\
If this question is unrelated, add a short, warm note that you mainly help \
with Mindtype, its content and company information. Phrase it naturally.";

const NO_REMINDER: &str = "\
If this question is unrelated, do not add any note about what you can help \
with.";

/// One assistant reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantReply {
    pub text: String,
    /// The model tagged the question as unrelated.
    pub off_topic: bool,
}

#[derive(Debug)]
pub struct Assistant {
    llm: Arc<dyn BaseLLM>,
    config: LLMConfig,
    knowledge_base: Option<Arc<KnowledgeBase>>,
    top_k: usize,
    tracker: OffTopicTracker,
}

impl Assistant {
    pub fn new(llm: Arc<dyn BaseLLM>, config: LLMConfig) -> Self {
        Self {
            llm,
            config,
            knowledge_base: None,
            top_k: DEFAULT_TOP_K,
            tracker: OffTopicTracker::new(),
        }
    }

    /// Builder method to attach a knowledge base for context.
    pub fn with_knowledge_base(mut self, knowledge_base: Arc<KnowledgeBase>, top_k: usize) -> Self {
        self.knowledge_base = Some(knowledge_base);
        self.top_k = top_k;
        self
    }

    pub fn tracker(&self) -> &OffTopicTracker {
        &self.tracker
    }

    /// Answer `query` for `session`.
    pub async fn reply(&self, session: &str, query: &str) -> Result<AssistantReply, LLMError> {
        let context = self.context(query).await;
        let reminder = if self.tracker.should_remind(session) {
            REMINDER
        } else {
            NO_REMINDER
        };
        let messages = [
            LLMMessage::system(format!("{PERSONA}\n{reminder}")),
            LLMMessage::user(format!("Context: {context}\nUser: {query}")),
        ];

        let raw = self.llm.call(&messages, &self.config).await?;
        let off_topic = OFF_TOPIC.is_match(&raw);
        if off_topic {
            let count = self.tracker.record(session);
            log::debug!("Session {session}: off-topic turn {count}");
        }
        Ok(AssistantReply {
            text: OFF_TOPIC.replace_all(&raw, " ").trim().to_string(),
            off_topic,
        })
    }

    async fn context(&self, query: &str) -> String {
        let Some(kb) = &self.knowledge_base else {
            return String::new();
        };
        match kb.retrieve(query, self.top_k).await {
            Retrieval::Passages(passages) => passages
                .iter()
                .map(|p| p.content.as_str())
                .collect::<Vec<_>>()
                .join("\n")
                .trim()
                .to_string(),
            Retrieval::NoRelevantInformation => String::new(),
            Retrieval::Unavailable(e) => {
                log::warn!("Assistant retrieval failed: {e}; answering without context");
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::InMemoryVectorStore;
    use crate::testing::{FailingEmbedding, KeywordEmbedding, ScriptedLLM};
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_reply_with_context() {
        let kb = KnowledgeBase::new(Arc::new(KeywordEmbedding), Arc::new(InMemoryVectorStore::new()));
        kb.ingest(&["Mindtype was founded by DirectEd scholars.".to_string()], &HashMap::new())
            .await
            .unwrap();
        let llm = Arc::new(ScriptedLLM::new(vec![Ok("We were founded by DirectEd scholars.".into())]));
        let assistant = Assistant::new(llm.clone(), LLMConfig::new("m")).with_knowledge_base(Arc::new(kb), 3);

        let reply = assistant.reply("s", "Who founded Mindtype?").await.unwrap();
        assert_eq!(reply.text, "We were founded by DirectEd scholars.");
        assert!(!reply.off_topic);
        let user = &llm.calls()[0][1].content;
        assert!(user.starts_with("Context: Mindtype was founded by DirectEd scholars.\nUser: Who founded"));
    }

    #[tokio::test]
    async fn test_retrieval_failure_gives_empty_context() {
        let kb = KnowledgeBase::new(Arc::new(FailingEmbedding), Arc::new(InMemoryVectorStore::new()));
        let llm = Arc::new(ScriptedLLM::new(vec![Ok("Hello!".into())]));
        let assistant = Assistant::new(llm.clone(), LLMConfig::new("m")).with_knowledge_base(Arc::new(kb), 3);
        assert_eq!(assistant.reply("s", "hi").await.unwrap().text, "Hello!");
        assert_eq!(llm.calls()[0][1].content, "Context: \nUser: hi");
    }

    #[tokio::test]
    async fn test_off_topic_marker_stripped_and_reminder_periodic() {
        let llm = Arc::new(ScriptedLLM::new(vec![
            Ok("[off-topic] Paris is the capital of France.".into()),
            Ok("[Off-Topic] It is sunny.".into()),
            Ok("[off-topic] 42.".into()),
        ]));
        let assistant = Assistant::new(llm.clone(), LLMConfig::new("m"));

        let first = assistant.reply("s", "Capital of France?").await.unwrap();
        assert_eq!(first.text, "Paris is the capital of France.");
        assert!(first.off_topic);
        assistant.reply("s", "Weather?").await.unwrap();
        assistant.reply("s", "Meaning of life?").await.unwrap();
        assert_eq!(assistant.tracker().count("s"), 3);

        let systems: Vec<bool> = llm
            .calls()
            .iter()
            .map(|call| call[0].content.ends_with(REMINDER))
            .collect();
        assert_eq!(systems, vec![true, false, true]);
    }
}
