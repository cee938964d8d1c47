//! Main Crew struct.
//!
//! A crew owns the task graph. `kickoff` runs it layer by layer: every task
//! in a layer whose dependencies all completed runs concurrently, the rest
//! are skipped. Upstream outputs reach a task as labeled context in the order
//! the task declares its dependencies, never in completion order.

use std::collections::HashMap;
use std::fmt;

use futures::future::join_all;
use thiserror::Error;
use uuid::Uuid;

use crate::crews::crew_output::{CrewOutput, TaskState};
use crate::crews::graph::{CrewConfigError, TaskGraph};
use crate::task::{Task, TaskError};
use crate::tasks::task_output::TaskOutput;

/// Separator between the outputs of different upstream tasks.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Failure of a crew run.
#[derive(Debug, Clone, Error)]
pub enum CrewError {
    /// The sink task ran and failed.
    #[error("final task failed: {0}")]
    SinkFailed(#[source] TaskError),

    /// The sink task never ran because an upstream task failed.
    #[error("final task '{task}' was skipped after failures in: {}", .failed.join(", "))]
    SinkSkipped { task: String, failed: Vec<String> },
}

/// Represents a group of agents and the tasks they perform.
pub struct Crew {
    /// Name of the crew, used in logs.
    pub name: String,
    /// Unique identifier for the crew instance.
    pub id: Uuid,
    /// Tasks in declaration order.
    tasks: Vec<Task>,
    /// Validated dependency graph over `tasks`.
    graph: TaskGraph,
}

impl fmt::Debug for Crew {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crew")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("layers", &self.graph.layer_names())
            .finish_non_exhaustive()
    }
}

impl Crew {
    /// Create a crew, validating the dependency graph before anything runs.
    pub fn new(tasks: Vec<Task>) -> Result<Self, CrewConfigError> {
        let nodes: Vec<(String, Vec<String>)> = tasks
            .iter()
            .map(|t| (t.name.clone(), t.depends_on.clone()))
            .collect();
        let graph = TaskGraph::build(&nodes)?;
        log::debug!("Crew graph resolved into layers {:?}", graph.layer_names());
        Ok(Self {
            name: "crew".to_string(),
            id: Uuid::new_v4(),
            tasks,
            graph,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// Name of the task whose output is the crew's output.
    pub fn sink_name(&self) -> &str {
        self.graph.name(self.graph.sink())
    }

    /// Execute the crew's workflow.
    ///
    /// # Arguments
    ///
    /// * `inputs` - Values for the `{placeholder}`s of the task templates.
    pub async fn kickoff(&self, inputs: &HashMap<String, String>) -> Result<CrewOutput, CrewError> {
        log::info!("Crew '{}' ({}) kickoff with {} tasks", self.name, self.id, self.tasks.len());
        let mut states: Vec<Option<TaskState>> = vec![None; self.tasks.len()];
        let mut failed_errors: Vec<Option<TaskError>> = vec![None; self.tasks.len()];

        for (depth, layer) in self.graph.layers().iter().enumerate() {
            let mut ready: Vec<(usize, String)> = Vec::new();
            for &idx in layer {
                let deps = self.graph.dependencies(idx);
                if deps.iter().all(|&d| matches!(states[d], Some(TaskState::Completed(_)))) {
                    ready.push((idx, self.compose_context(idx, &states)));
                } else {
                    log::warn!(
                        "Skipping task '{}': an upstream task did not complete",
                        self.tasks[idx].name
                    );
                    states[idx] = Some(TaskState::Skipped);
                }
            }

            log::debug!("Layer {depth}: running {} task(s) concurrently", ready.len());
            let results = join_all(
                ready
                    .iter()
                    .map(|(idx, context)| self.tasks[*idx].execute(inputs, context)),
            )
            .await;

            for ((idx, _), result) in ready.iter().zip(results) {
                let task = &self.tasks[*idx];
                match result {
                    Ok(output) => {
                        log::info!("Task '{}' completed", task.name);
                        states[*idx] = Some(TaskState::Completed(output));
                    }
                    Err(e) => {
                        log::error!("Task '{}' failed: {e}", task.name);
                        states[*idx] = Some(TaskState::Failed { error: e.to_string() });
                        failed_errors[*idx] = Some(e);
                    }
                }
            }
        }

        let sink = self.graph.sink();
        if let Some(error) = failed_errors[sink].take() {
            return Err(CrewError::SinkFailed(error));
        }

        let tasks: Vec<(String, TaskState)> = self
            .tasks
            .iter()
            .zip(states)
            .map(|(task, state)| (task.name.clone(), state.unwrap_or(TaskState::Skipped)))
            .collect();

        match tasks[sink].1.output().cloned() {
            Some(final_output) => Ok(CrewOutput::new(final_output, tasks)),
            None => Err(CrewError::SinkSkipped {
                task: self.sink_name().to_string(),
                failed: tasks
                    .iter()
                    .filter(|(_, s)| matches!(s, TaskState::Failed { .. }))
                    .map(|(n, _)| n.clone())
                    .collect(),
            }),
        }
    }

    /// Labeled outputs of the direct dependencies of `idx`, in declaration
    /// order.
    fn compose_context(&self, idx: usize, states: &[Option<TaskState>]) -> String {
        self.graph
            .dependencies(idx)
            .iter()
            .filter_map(|&d| states[d].as_ref().and_then(TaskState::output))
            .map(label_output)
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR)
    }
}

fn label_output(output: &TaskOutput) -> String {
    format!("### {} ({})\n{}", output.name, output.agent, output)
}
