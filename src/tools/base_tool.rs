//! Base tool definitions.
//!
//! A tool is a named capability `query -> text report`. Internal failures
//! are typed as [`ToolError`] but [`BaseTool::run`] converts every error into
//! a human-readable string so an agent can keep reasoning.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ToolError
// ---------------------------------------------------------------------------

/// Failure inside a tool. Never escapes [`BaseTool::run`].
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    /// The tool input could not be interpreted.
    #[error("invalid tool input: {0}")]
    InvalidInput(String),

    /// The upstream provider failed.
    #[error("{0}")]
    Provider(String),

    /// The provider returned nothing usable.
    #[error("{0}")]
    Empty(String),
}

// ---------------------------------------------------------------------------
// ToolInput
// ---------------------------------------------------------------------------

/// Parsed tool input: a query plus optional named parameters.
///
/// Agents send either plain text or a JSON object such as
/// `{"query": "...", "max_results": 3}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolInput {
    /// The query text.
    pub query: String,
    /// Additional parameters.
    pub params: HashMap<String, Value>,
}

impl ToolInput {
    /// Create an input holding only a query.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            params: HashMap::new(),
        }
    }

    /// Parse raw action input.
    ///
    /// A JSON object takes its query from `query`, `search_query`, `topic` or
    /// `input` (first found); a JSON string is unwrapped; anything else is
    /// used verbatim after trimming surrounding quotes.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(map)) => {
                let mut params: HashMap<String, Value> = map.into_iter().collect();
                let query = ["query", "search_query", "topic", "input"]
                    .iter()
                    .find_map(|key| match params.remove(*key) {
                        Some(Value::String(s)) => Some(s),
                        Some(other) => Some(other.to_string()),
                        None => None,
                    })
                    .unwrap_or_default();
                Self { query, params }
            }
            Ok(Value::String(s)) => Self::new(s),
            _ => Self::new(trimmed.trim_matches('"')),
        }
    }

    /// Read an unsigned integer parameter.
    pub fn usize_param(&self, key: &str) -> Option<usize> {
        self.params
            .get(key)
            .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
            .map(|n| n as usize)
    }
}

// ---------------------------------------------------------------------------
// BaseTool trait
// ---------------------------------------------------------------------------

/// Trait for all tools an agent can call.
///
/// Implementors provide `name`, `description` and `execute`. The provided
/// `run` never fails.
#[async_trait]
pub trait BaseTool: Send + Sync + fmt::Debug {
    /// The unique name of the tool, used in `Action:` lines.
    fn name(&self) -> &str;

    /// Description used to tell the model how/when/why to use the tool.
    fn description(&self) -> &str;

    /// Run the tool, surfacing internal failures.
    async fn execute(&self, input: &ToolInput) -> Result<String, ToolError>;

    /// Text returned when `execute` fails.
    fn failure_message(&self, error: &ToolError) -> String {
        format!("Error running {}: {error}", self.name())
    }

    /// Run the tool, converting any failure into a text result.
    async fn run(&self, input: &ToolInput) -> String {
        log::debug!("Tool '{}' invoked with query '{}'", self.name(), input.query);
        match self.execute(input).await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Tool '{}' failed: {e}", self.name());
                self.failure_message(&e)
            }
        }
    }
}

/// Render a tool list for an agent prompt.
pub fn render_text_description(tools: &[std::sync::Arc<dyn BaseTool>]) -> String {
    tools
        .iter()
        .map(|t| format!("Tool Name: {}\nTool Description: {}", t.name(), t.description()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Failing;

    #[async_trait]
    impl BaseTool for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        async fn execute(&self, _input: &ToolInput) -> Result<String, ToolError> {
            Err(ToolError::Provider("boom".into()))
        }
    }

    #[test]
    fn test_parse_plain_text() {
        let input = ToolInput::parse("  edge computing  ");
        assert_eq!(input.query, "edge computing");
        assert!(input.params.is_empty());
    }

    #[test]
    fn test_parse_quoted_text() {
        assert_eq!(ToolInput::parse("\"edge computing\"").query, "edge computing");
    }

    #[test]
    fn test_parse_json_object() {
        let input = ToolInput::parse(r#"{"search_query": "rust", "max_results": 3}"#);
        assert_eq!(input.query, "rust");
        assert_eq!(input.usize_param("max_results"), Some(3));
    }

    #[test]
    fn test_parse_json_object_without_query() {
        let input = ToolInput::parse(r#"{"max_results": "2"}"#);
        assert_eq!(input.query, "");
        assert_eq!(input.usize_param("max_results"), Some(2));
    }

    #[tokio::test]
    async fn test_run_never_fails() {
        let out = Failing.run(&ToolInput::new("x")).await;
        assert_eq!(out, "Error running failing: boom");
    }

    #[test]
    fn test_render_text_description() {
        let tools: Vec<Arc<dyn BaseTool>> = vec![Arc::new(Failing)];
        assert_eq!(
            render_text_description(&tools),
            "Tool Name: failing\nTool Description: Always fails"
        );
    }
}
