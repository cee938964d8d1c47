//! Crew sub-modules: dependency graph resolution and crew output.

pub mod crew_output;
pub mod graph;

pub use crew_output::{CrewOutput, TaskState};
pub use graph::{CrewConfigError, TaskGraph};
