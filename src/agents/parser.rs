//! ReAct output parsing.
//!
//! Turns a completion into either a tool action or a final answer:
//!
//! ```text
//! Thought: I should look this up
//! Action: web_search_tool
//! Action Input: {"query": "edge computing"}
//! ```
//!
//! ```text
//! Thought: I now know the final answer
//! Final Answer: ...
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// The text prefix for a final answer.
pub const FINAL_ANSWER_ACTION: &str = "Final Answer:";

const MISSING_ACTION_AFTER_THOUGHT_ERROR_MESSAGE: &str =
    "I just got this: I couldn't find an Action after the Thought.";

const MISSING_ACTION_INPUT_AFTER_ACTION_ERROR_MESSAGE: &str =
    "I just got this: I found an Action but couldn't find a valid Action Input right after it.";

static ACTION_INPUT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:\s*(.+?)\s*(?:\n|\r\n?)Action\s*\d*\s*Input\s*\d*\s*:\s*(.*)").unwrap()
});
static ACTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Action\s*\d*\s*:").unwrap());
static ACTION_INPUT_ONLY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Action\s*\d*\s*Input\s*\d*\s*:").unwrap());
static OBSERVATION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*Observation\s*:").unwrap());

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentAction {
    /// Reasoning before the action.
    pub thought: String,
    /// Name of the tool to use.
    pub tool: String,
    /// Raw input for the tool.
    pub tool_input: String,
    /// The text up to and including the action input.
    pub text: String,
}

/// The model's final answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentFinish {
    pub thought: String,
    pub output: String,
    pub text: String,
}

/// Result of parsing agent output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult {
    Action(AgentAction),
    Finish(AgentFinish),
}

/// The completion followed neither format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error}")]
pub struct OutputParserError {
    pub error: String,
}

impl OutputParserError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Parse agent output text.
///
/// A final answer wins over an action when both appear. Any text the model
/// hallucinated after `Observation:` is discarded from an action.
pub fn parse(text: &str) -> Result<ParseResult, OutputParserError> {
    let thought = extract_thought(text);

    if let Some(idx) = text.rfind(FINAL_ANSWER_ACTION) {
        let final_answer = text[idx + FINAL_ANSWER_ACTION.len()..].trim();
        return Ok(ParseResult::Finish(AgentFinish {
            thought,
            output: clean_trailing_backticks(final_answer),
            text: text.to_string(),
        }));
    }

    let text = match OBSERVATION_RE.find(text) {
        Some(m) => &text[..m.start()],
        None => text,
    };

    if let Some(caps) = ACTION_INPUT_RE.captures(text) {
        let tool = clean_action(caps.get(1).map_or("", |m| m.as_str()));
        let raw_input = caps.get(2).map_or("", |m| m.as_str()).trim();
        let tool_input = repair_tool_input(raw_input.trim_matches('"'));
        return Ok(ParseResult::Action(AgentAction {
            thought,
            tool,
            tool_input,
            text: text.trim_end().to_string(),
        }));
    }

    if !ACTION_RE.is_match(text) {
        return Err(OutputParserError::new(format!(
            "{MISSING_ACTION_AFTER_THOUGHT_ERROR_MESSAGE}\nYou MUST use the following format:\n\
             Thought: [your thought]\n\
             Final Answer: [your final answer]"
        )));
    }

    if !ACTION_INPUT_ONLY_RE.is_match(text) {
        return Err(OutputParserError::new(MISSING_ACTION_INPUT_AFTER_ACTION_ERROR_MESSAGE));
    }

    Err(OutputParserError::new(
        "Could not parse the output. Please use the correct format.",
    ))
}

fn extract_thought(text: &str) -> String {
    let idx = text.find("\nAction").or_else(|| text.find("\nFinal Answer"));
    match idx {
        Some(idx) => {
            let thought = text[..idx].trim().replace("```", "");
            thought
                .trim()
                .trim_start_matches("Thought:")
                .trim()
                .to_string()
        }
        None => String::new(),
    }
}

/// Strip markdown emphasis around a tool name.
fn clean_action(text: &str) -> String {
    text.trim().trim_matches('*').trim().trim_matches('`').trim().to_string()
}

/// Remove an unmatched trailing code fence.
fn clean_trailing_backticks(text: &str) -> String {
    if text.ends_with("```") && text.matches("```").count() % 2 != 0 {
        return text[..text.len() - 3].trim_end().to_string();
    }
    text.to_string()
}

/// Strip code fences around the input and repair triple-quoted JSON.
fn repair_tool_input(tool_input: &str) -> String {
    let unfenced = tool_input
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    if unfenced.starts_with('[') && unfenced.ends_with(']') {
        return unfenced.to_string();
    }
    let cleaned = unfenced.replace("\"\"\"", "\"");
    if serde_json::from_str::<serde_json::Value>(&cleaned).is_ok() {
        cleaned
    } else {
        unfenced.to_string()
    }
}
