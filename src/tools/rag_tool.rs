//! Knowledge-base retrieval tool.

use std::sync::Arc;

use async_trait::async_trait;

use crate::rag::{KnowledgeBase, Retrieval, DEFAULT_TOP_K};
use crate::tools::base_tool::{BaseTool, ToolError, ToolInput};

/// Returned when the index answers with no matching passages.
pub const NO_RELEVANT_INFORMATION: &str = "No relevant information found in the knowledge base.";

pub const RAG_TOOL_NAME: &str = "rag_tool";

#[derive(Debug, Clone)]
pub struct RagTool {
    knowledge_base: Arc<KnowledgeBase>,
    top_k: usize,
}

impl RagTool {
    pub fn new(knowledge_base: Arc<KnowledgeBase>) -> Self {
        Self {
            knowledge_base,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Builder method to set the number of passages retrieved.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }
}

#[async_trait]
impl BaseTool for RagTool {
    fn name(&self) -> &str {
        RAG_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Retrieve relevant context about the company and its past content from the knowledge base. Input: a search query."
    }

    async fn execute(&self, input: &ToolInput) -> Result<String, ToolError> {
        log::info!("RAG tool: searching knowledge base for '{}'", input.query);
        let k = input.usize_param("k").unwrap_or(self.top_k);
        match self.knowledge_base.retrieve(&input.query, k).await {
            Retrieval::Passages(passages) => Ok(passages
                .iter()
                .map(|p| p.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n")),
            Retrieval::NoRelevantInformation => Ok(NO_RELEVANT_INFORMATION.to_string()),
            Retrieval::Unavailable(e) => Err(ToolError::Provider(e.to_string())),
        }
    }

    fn failure_message(&self, error: &ToolError) -> String {
        format!("Error retrieving context from knowledge base: {error}. Please proceed without.")
    }
}
