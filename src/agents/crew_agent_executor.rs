//! ReAct execution loop.
//!
//! Calls the completion service, parses each response with
//! [`parser::parse`](crate::agents::parser::parse), runs requested tools and
//! feeds their output back as observations until a final answer arrives.

use std::sync::Arc;

use crate::agents::parser::{parse, ParseResult};
use crate::llms::base_llm::{BaseLLM, LLMConfig, LLMError, LLMMessage};
use crate::tools::base_tool::{BaseTool, ToolInput};

/// Sent when the iteration budget is exhausted.
const FORCE_FINAL_ANSWER: &str = "Now it's time you MUST give your absolute best final answer. \
    You'll ignore all previous instructions, stop using any tools, and just return your absolute BEST Final answer.";

/// Executor for one agent run. Consumed by [`invoke`](Self::invoke).
pub struct CrewAgentExecutor<'a> {
    llm: &'a dyn BaseLLM,
    config: &'a LLMConfig,
    tools: &'a [Arc<dyn BaseTool>],
    max_iter: usize,
    messages: Vec<LLMMessage>,
    iterations: usize,
}

impl<'a> CrewAgentExecutor<'a> {
    pub fn new(
        llm: &'a dyn BaseLLM,
        config: &'a LLMConfig,
        tools: &'a [Arc<dyn BaseTool>],
        max_iter: usize,
        messages: Vec<LLMMessage>,
    ) -> Self {
        Self {
            llm,
            config,
            tools,
            max_iter: max_iter.max(1),
            messages,
            iterations: 0,
        }
    }

    /// Run the loop to a final answer.
    pub async fn invoke(mut self) -> Result<String, LLMError> {
        loop {
            if self.iterations >= self.max_iter {
                log::warn!("Agent reached max iterations ({}); forcing final answer", self.max_iter);
                self.messages.push(LLMMessage::user(FORCE_FINAL_ANSWER));
                let text = self.llm.call(&self.messages, self.config).await?;
                return Ok(final_text(&text));
            }

            let text = self.llm.call(&self.messages, self.config).await?;
            self.iterations += 1;

            match parse(&text) {
                Ok(ParseResult::Finish(finish)) => return Ok(finish.output),
                Ok(ParseResult::Action(action)) => {
                    let observation = self.use_tool(&action.tool, &action.tool_input).await;
                    self.messages.push(LLMMessage::assistant(action.text));
                    self.messages
                        .push(LLMMessage::user(format!("Observation: {observation}")));
                }
                Err(e) => {
                    log::debug!("Unparseable agent output accepted as final answer: {e}");
                    return Ok(text.trim().to_string());
                }
            }
        }
    }

    async fn use_tool(&self, name: &str, raw_input: &str) -> String {
        match self.tools.iter().find(|t| t.name() == name) {
            Some(tool) => {
                log::info!("Using tool '{name}'");
                tool.run(&ToolInput::parse(raw_input)).await
            }
            None => {
                let available: Vec<&str> = self.tools.iter().map(|t| t.name()).collect();
                log::warn!("Agent requested unknown tool '{name}'");
                format!(
                    "Action '{name}' don't exist, these are the only available Actions: {}",
                    available.join(", ")
                )
            }
        }
    }
}

/// The final answer if the text contains one, otherwise the whole text.
fn final_text(text: &str) -> String {
    match parse(text) {
        Ok(ParseResult::Finish(finish)) => finish.output,
        _ => text.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EchoTool, ScriptedLLM};

    fn config() -> LLMConfig {
        LLMConfig::new("test")
    }

    #[tokio::test]
    async fn test_tool_loop_reaches_final_answer() {
        let llm = ScriptedLLM::new(vec![
            Ok("Thought: look up\nAction: echo\nAction Input: {\"query\": \"edge\"}".into()),
            Ok("Thought: done\nFinal Answer: result".into()),
        ]);
        let tools: Vec<Arc<dyn BaseTool>> = vec![Arc::new(EchoTool)];
        let config = config();
        let out = CrewAgentExecutor::new(&llm, &config, &tools, 5, vec![LLMMessage::user("go")])
            .invoke()
            .await
            .unwrap();
        assert_eq!(out, "result");

        let calls = llm.calls();
        assert_eq!(calls.len(), 2);
        let last = calls[1].last().unwrap();
        assert_eq!(last.content, "Observation: echo: edge");
    }

    #[tokio::test]
    async fn test_unknown_tool_lists_available() {
        let llm = ScriptedLLM::new(vec![
            Ok("Action: nope\nAction Input: x".into()),
            Ok("Final Answer: ok".into()),
        ]);
        let tools: Vec<Arc<dyn BaseTool>> = vec![Arc::new(EchoTool)];
        let config = config();
        CrewAgentExecutor::new(&llm, &config, &tools, 5, vec![])
            .invoke()
            .await
            .unwrap();
        let calls = llm.calls();
        let observation = &calls[1].last().unwrap().content;
        assert!(observation.contains("these are the only available Actions: echo"));
    }

    #[tokio::test]
    async fn test_unparseable_output_is_final() {
        let llm = ScriptedLLM::new(vec![Ok("  Just prose.  ".into())]);
        let config = config();
        let out = CrewAgentExecutor::new(&llm, &config, &[], 3, vec![])
            .invoke()
            .await
            .unwrap();
        assert_eq!(out, "Just prose.");
    }

    #[tokio::test]
    async fn test_max_iter_forces_answer() {
        let llm = ScriptedLLM::new(vec![
            Ok("Action: echo\nAction Input: a".into()),
            Ok("Final Answer: forced".into()),
        ]);
        let tools: Vec<Arc<dyn BaseTool>> = vec![Arc::new(EchoTool)];
        let config = config();
        let out = CrewAgentExecutor::new(&llm, &config, &tools, 1, vec![])
            .invoke()
            .await
            .unwrap();
        assert_eq!(out, "forced");
        assert!(llm.calls()[1].last().unwrap().content.starts_with("Now it's time"));
    }

    #[tokio::test]
    async fn test_llm_error_propagates() {
        let llm = ScriptedLLM::new(vec![Err(LLMError::Transport("down".into()))]);
        let config = config();
        let result = CrewAgentExecutor::new(&llm, &config, &[], 3, vec![]).invoke().await;
        assert!(matches!(result, Err(LLMError::Transport(_))));
    }
}
