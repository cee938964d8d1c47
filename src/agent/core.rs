//! Core Agent struct.
//!
//! An agent binds a persona (role, goal, backstory), a set of tools and a
//! completion-service configuration into every call it makes. It holds no
//! state between runs.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::agents::crew_agent_executor::CrewAgentExecutor;
use crate::llms::base_llm::{BaseLLM, LLMConfig, LLMError, LLMMessage};
use crate::tools::base_tool::{render_text_description, BaseTool};

/// Default iteration budget of the tool loop.
pub const DEFAULT_MAX_ITER: usize = 15;

/// Failure of an agent run.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    /// The completion service failed.
    #[error(transparent)]
    Llm(#[from] LLMError),

    /// The run exceeded `max_execution_time`.
    #[error("agent run exceeded {0:?}")]
    Timeout(Duration),
}

/// Represents an agent.
#[derive(Clone)]
pub struct Agent {
    /// Role of the agent; also its identity in logs.
    pub role: String,
    /// Objective of the agent.
    pub goal: String,
    /// Backstory of the agent.
    pub backstory: String,
    /// Tools at the agent's disposal, in binding order.
    pub tools: Vec<Arc<dyn BaseTool>>,
    /// Completion parameters sent with every call.
    pub llm_config: LLMConfig,
    /// Maximum tool-loop iterations before a final answer is forced.
    pub max_iter: usize,
    /// Upper bound on one whole run.
    pub max_execution_time: Option<Duration>,
    /// Completion service.
    llm: Arc<dyn BaseLLM>,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("role", &self.role)
            .field("tools", &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>())
            .field("llm_config", &self.llm_config)
            .field("max_iter", &self.max_iter)
            .field("max_execution_time", &self.max_execution_time)
            .finish()
    }
}

impl Agent {
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
        llm: Arc<dyn BaseLLM>,
        llm_config: LLMConfig,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            tools: Vec::new(),
            llm_config,
            max_iter: DEFAULT_MAX_ITER,
            max_execution_time: None,
            llm,
        }
    }

    /// Builder method to bind tools.
    pub fn with_tools(mut self, tools: Vec<Arc<dyn BaseTool>>) -> Self {
        self.tools = tools;
        self
    }

    /// Builder method to set the iteration budget.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    /// Builder method to bound the run time.
    pub fn with_max_execution_time(mut self, limit: Option<Duration>) -> Self {
        self.max_execution_time = limit;
        self
    }

    /// The system message for this agent.
    pub fn system_prompt(&self) -> String {
        let persona = format!(
            "You are {}. {}\nYour personal goal is: {}",
            self.role, self.backstory, self.goal
        );
        if self.tools.is_empty() {
            return format!(
                "{persona}\nTo give my best complete final answer to the task respond using the exact following format:\n\n\
                 Thought: I now can give a great answer\n\
                 Final Answer: Your final answer must be the great and the most complete as possible, it must be outcome described."
            );
        }
        let names: Vec<&str> = self.tools.iter().map(|t| t.name()).collect();
        format!(
            "{persona}\nYou ONLY have access to the following tools, and should NEVER make up tools that are not listed here:\n\n\
             {}\n\n\
             IMPORTANT: Use the following format in your response:\n\n\
             ```\n\
             Thought: you should always think about what to do\n\
             Action: the action to take, only one name of [{}], just the name, exactly as it's written.\n\
             Action Input: the input to the action, just a simple JSON object, enclosed in curly braces, using \" to wrap keys and values.\n\
             Observation: the result of the action\n\
             ```\n\n\
             Once all necessary information is gathered, return the following format:\n\n\
             ```\n\
             Thought: I now know the final answer\n\
             Final Answer: the final answer to the original input question\n\
             ```",
            render_text_description(&self.tools),
            names.join(", "),
        )
    }

    /// Run a prompt with the given context and return the final text.
    pub async fn run(&self, prompt: &str, context: &str) -> Result<String, AgentError> {
        log::debug!("Agent '{}' running with {} tools", self.role, self.tools.len());
        let user = if context.trim().is_empty() {
            prompt.to_string()
        } else {
            format!("{prompt}\n\nThis is the context you're working with:\n{context}")
        };
        let messages = vec![LLMMessage::system(self.system_prompt()), LLMMessage::user(user)];

        let work = self.execute(messages);
        match self.max_execution_time {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .map_err(|_| AgentError::Timeout(limit))?,
            None => work.await,
        }
    }

    async fn execute(&self, messages: Vec<LLMMessage>) -> Result<String, AgentError> {
        if self.tools.is_empty() {
            let text = self.llm.call(&messages, &self.llm_config).await?;
            return Ok(strip_final_answer(&text));
        }
        let executor = CrewAgentExecutor::new(
            self.llm.as_ref(),
            &self.llm_config,
            &self.tools,
            self.max_iter,
            messages,
        );
        Ok(executor.invoke().await?)
    }
}

/// Drop a leading `Thought:` / `Final Answer:` preamble from a direct reply.
fn strip_final_answer(text: &str) -> String {
    match text.rfind(crate::agents::parser::FINAL_ANSWER_ACTION) {
        Some(idx) => text[idx + crate::agents::parser::FINAL_ANSWER_ACTION.len()..]
            .trim()
            .to_string(),
        None => text.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EchoTool, ScriptedLLM};

    fn agent(llm: Arc<ScriptedLLM>) -> Agent {
        Agent::new("Writer", "Write posts", "A seasoned writer.", llm, LLMConfig::new("m"))
    }

    #[tokio::test]
    async fn test_run_without_tools_single_call() {
        let llm = Arc::new(ScriptedLLM::new(vec![Ok("Thought: ok\nFinal Answer: Draft".into())]));
        let out = agent(llm.clone()).run("Write", "Some context").await.unwrap();
        assert_eq!(out, "Draft");

        let calls = llm.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0].role, "system");
        assert!(calls[0][0].content.starts_with("You are Writer. A seasoned writer."));
        assert!(calls[0][1]
            .content
            .ends_with("This is the context you're working with:\nSome context"));
    }

    #[tokio::test]
    async fn test_run_with_tools_uses_loop() {
        let llm = Arc::new(ScriptedLLM::new(vec![
            Ok("Action: echo\nAction Input: hi".into()),
            Ok("Final Answer: done".into()),
        ]));
        let a = agent(llm.clone()).with_tools(vec![Arc::new(EchoTool)]);
        assert!(a.system_prompt().contains("Tool Name: echo"));
        assert_eq!(a.run("task", "").await.unwrap(), "done");
        assert_eq!(llm.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_llm_failure_is_agent_error() {
        let llm = Arc::new(ScriptedLLM::new(vec![Err(LLMError::Transport("down".into()))]));
        assert!(matches!(
            agent(llm).run("task", "").await,
            Err(AgentError::Llm(LLMError::Transport(_)))
        ));
    }

    #[tokio::test]
    async fn test_timeout() {
        let llm = Arc::new(ScriptedLLM::new(vec![Ok("late".into())]).with_delay(Duration::from_millis(200)));
        let a = agent(llm).with_max_execution_time(Some(Duration::from_millis(20)));
        assert!(matches!(a.run("task", "").await, Err(AgentError::Timeout(_))));
    }
}
