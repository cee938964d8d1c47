//! Main Task struct.
//!
//! A task is one node of the pipeline graph: a prompt template bound to one
//! agent, a list of upstream task names and an optional output schema.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::agent::{Agent, AgentError};
use crate::tasks::output_schema::{OutputSchema, SchemaError};
use crate::tasks::task_output::TaskOutput;
use crate::utilities::string_utils::interpolate_only;

/// Default number of re-prompts after a schema validation failure.
pub const DEFAULT_SCHEMA_RETRIES: usize = 2;

const MARKDOWN_INSTRUCTION: &str = "\
Your final answer MUST be formatted in Markdown syntax.\n\
Follow these guidelines:\n\
- Use # for headers\n\
- Use ** for bold text\n\
- Use * for italic text\n\
- Use - or * for bullet points\n\
- Use `code` for inline code\n\
- Use ```language for code blocks";

/// Failure of a task.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    /// The agent (or the completion service behind it) failed.
    #[error("task '{task}' failed: {source}")]
    Agent {
        task: String,
        #[source]
        source: AgentError,
    },

    /// Output did not validate against the task's schema after all retries.
    #[error("task '{task}' output failed validation: {source}")]
    Schema {
        task: String,
        #[source]
        source: SchemaError,
    },

    /// A prompt placeholder had no value.
    #[error("task '{task}' is missing input '{input}'")]
    MissingInput { task: String, input: String },
}

/// Represents a task to be executed.
#[derive(Clone)]
pub struct Task {
    /// Unique task name; dependencies refer to it.
    pub name: String,
    /// Prompt template with `{placeholder}` inputs.
    pub description: String,
    /// Clear definition of expected task outcome; also a template.
    pub expected_output: String,
    /// Agent responsible for execution.
    pub agent: Arc<Agent>,
    /// Names of upstream tasks, in declaration order.
    pub depends_on: Vec<String>,
    /// Schema the output must satisfy.
    pub output_schema: Option<OutputSchema>,
    /// Whether to instruct the agent to answer in markdown.
    pub markdown: bool,
    /// Re-prompts allowed after a validation failure.
    pub schema_retries: usize,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("agent", &self.agent.role)
            .field("depends_on", &self.depends_on)
            .field("output_schema", &self.output_schema.as_ref().map(|s| &s.name))
            .finish()
    }
}

impl Task {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        expected_output: impl Into<String>,
        agent: Arc<Agent>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            expected_output: expected_output.into(),
            agent,
            depends_on: Vec::new(),
            output_schema: None,
            markdown: false,
            schema_retries: DEFAULT_SCHEMA_RETRIES,
        }
    }

    /// Builder method to declare upstream tasks.
    pub fn with_dependencies<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = names.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method to declare an output schema.
    pub fn with_output_schema(mut self, schema: OutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn with_markdown(mut self, markdown: bool) -> Self {
        self.markdown = markdown;
        self
    }

    pub fn with_schema_retries(mut self, retries: usize) -> Self {
        self.schema_retries = retries;
        self
    }

    /// Render the full prompt for `inputs`.
    pub fn prompt(&self, inputs: &HashMap<String, String>) -> Result<String, TaskError> {
        let render = |template: &str| {
            interpolate_only(template, inputs).map_err(|input| TaskError::MissingInput {
                task: self.name.clone(),
                input,
            })
        };

        let mut slices = vec![
            render(&self.description)?,
            format!("Expected Output: {}", render(&self.expected_output)?),
        ];
        if self.markdown {
            slices.push(MARKDOWN_INSTRUCTION.to_string());
        }
        if let Some(schema) = &self.output_schema {
            slices.push(schema.instructions());
        }
        Ok(slices.join("\n"))
    }

    /// Execute the task with the composed upstream context.
    pub async fn execute(
        &self,
        inputs: &HashMap<String, String>,
        context: &str,
    ) -> Result<TaskOutput, TaskError> {
        let prompt = self.prompt(inputs)?;
        log::info!("Task '{}' started by agent '{}'", self.name, self.agent.role);

        let mut raw = self.run_agent(&prompt, context).await?;

        let Some(schema) = &self.output_schema else {
            return Ok(TaskOutput::new(&self.name, &self.agent.role, &self.description, raw));
        };

        let mut attempt = 0;
        loop {
            match schema.validate(&raw) {
                Ok(structured) => {
                    return Ok(TaskOutput::new(&self.name, &self.agent.role, &self.description, raw)
                        .with_structured(structured));
                }
                Err(e) if attempt < self.schema_retries => {
                    attempt += 1;
                    log::warn!(
                        "Task '{}' output failed validation ({e}); retry {attempt}/{}",
                        self.name,
                        self.schema_retries
                    );
                    let retry_prompt = format!(
                        "{prompt}\n\nYour previous answer could not be used: {e}.\n{}",
                        schema.instructions()
                    );
                    raw = self.run_agent(&retry_prompt, context).await?;
                }
                Err(e) => {
                    return Err(TaskError::Schema {
                        task: self.name.clone(),
                        source: e,
                    })
                }
            }
        }
    }

    async fn run_agent(&self, prompt: &str, context: &str) -> Result<String, TaskError> {
        self.agent
            .run(prompt, context)
            .await
            .map_err(|source| TaskError::Agent {
                task: self.name.clone(),
                source,
            })
    }
}
