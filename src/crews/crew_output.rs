//! Crew output representation.
//!
//! Represents the result of a crew run: the sink task's output plus the
//! final state of every task in the graph.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tasks::task_output::TaskOutput;

/// Final state of one task slot after a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TaskState {
    Completed(TaskOutput),
    /// The task ran and failed; carries the rendered error.
    Failed { error: String },
    /// Never started because an upstream task failed or was skipped.
    Skipped,
}

impl TaskState {
    pub fn output(&self) -> Option<&TaskOutput> {
        match self {
            TaskState::Completed(output) => Some(output),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TaskState::Completed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskState::Completed(_) => "completed",
            TaskState::Failed { .. } => "failed",
            TaskState::Skipped => "skipped",
        }
    }
}

/// Class that represents the result of a crew.
///
/// # Fields
///
/// * `raw` - Raw output of the sink task.
/// * `final_output` - Output of the sink task.
/// * `tasks` - Every task with its final state, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewOutput {
    /// Raw output of the sink task.
    pub raw: String,
    /// Output of the sink task.
    pub final_output: TaskOutput,
    /// Task name and final state, in declaration order.
    pub tasks: Vec<(String, TaskState)>,
}

impl CrewOutput {
    pub fn new(final_output: TaskOutput, tasks: Vec<(String, TaskState)>) -> Self {
        Self {
            raw: final_output.raw.clone(),
            final_output,
            tasks,
        }
    }

    /// Outputs of the completed tasks, in declaration order.
    pub fn tasks_output(&self) -> Vec<&TaskOutput> {
        self.tasks.iter().filter_map(|(_, state)| state.output()).collect()
    }

    /// State of a task by name.
    pub fn state(&self, name: &str) -> Option<&TaskState> {
        self.tasks.iter().find(|(n, _)| n == name).map(|(_, s)| s)
    }

    /// Dict-like view keyed by task name, plus `final_output` for the sink.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        for output in self.tasks_output() {
            map.insert(output.name.clone(), output.to_value());
        }
        map.insert("final_output".to_string(), self.final_output.to_value());
        Value::Object(map)
    }
}

impl fmt::Display for CrewOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.final_output)
    }
}
