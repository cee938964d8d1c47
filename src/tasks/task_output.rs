//! Task output representation and formatting.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The result of one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutput {
    /// Name of the task.
    pub name: String,
    /// Role of the agent that executed the task.
    pub agent: String,
    /// Raw output of the task.
    pub raw: String,
    /// Validated structured payload, for tasks declaring a schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<Map<String, Value>>,
    /// Summary of the task (first ten words of its description).
    pub summary: String,
}

impl TaskOutput {
    pub fn new(name: impl Into<String>, agent: impl Into<String>, description: &str, raw: String) -> Self {
        Self {
            name: name.into(),
            agent: agent.into(),
            raw,
            structured: None,
            summary: Self::generate_summary(description),
        }
    }

    /// Builder method to attach the structured payload.
    pub fn with_structured(mut self, structured: Map<String, Value>) -> Self {
        self.structured = Some(structured);
        self
    }

    /// Generate a summary from the description (first 10 words + "...").
    fn generate_summary(description: &str) -> String {
        let excerpt = description
            .split_whitespace()
            .take(10)
            .collect::<Vec<&str>>()
            .join(" ");
        format!("{excerpt}...")
    }

    /// The structured payload as an object, or the raw text as a string.
    pub fn to_value(&self) -> Value {
        match &self.structured {
            Some(map) => Value::Object(map.clone()),
            None => Value::String(self.raw.clone()),
        }
    }
}

impl fmt::Display for TaskOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.structured {
            Some(map) => write!(f, "{}", Value::Object(map.clone())),
            None => write!(f, "{}", self.raw),
        }
    }
}
