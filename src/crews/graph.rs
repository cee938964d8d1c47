//! Dependency graph resolution for crew tasks.
//!
//! Resolves task dependencies into execution layers using Kahn's algorithm.
//! Layer 0 holds tasks with no dependencies; layer N holds tasks whose
//! dependencies all sit in layers 0..N-1. Tasks within a layer can run
//! concurrently. Every configuration problem is reported here, before any
//! task runs.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

// ---------------------------------------------------------------------------
// CrewConfigError
// ---------------------------------------------------------------------------

/// Invalid pipeline configuration. Fatal at build time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrewConfigError {
    #[error("no tasks defined")]
    Empty,

    #[error("duplicate task name '{0}'")]
    DuplicateTask(String),

    #[error("task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    #[error("circular dependency detected among tasks: {}", .0.join(", "))]
    Cycle(Vec<String>),

    #[error("multiple sink tasks: {}", .0.join(", "))]
    MultipleSinks(Vec<String>),

    #[error("task '{task}' references unknown agent '{agent}'")]
    UnknownAgent { task: String, agent: String },

    #[error("agent '{agent}' references unknown tool '{tool}'")]
    UnknownTool { agent: String, tool: String },

    #[error("task '{task}' references unknown output schema '{schema}'")]
    UnknownSchema { task: String, schema: String },

    #[error("task '{task}' uses unknown input '{{{input}}}'")]
    UnknownInput { task: String, input: String },
}

// ---------------------------------------------------------------------------
// TaskGraph
// ---------------------------------------------------------------------------

/// Validated task graph over declaration indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskGraph {
    /// Task names in declaration order.
    names: Vec<String>,
    /// Direct dependencies per task, in declaration order of the edge list.
    dependencies: Vec<Vec<usize>>,
    /// Execution layers; each sorted by declaration index.
    layers: Vec<Vec<usize>>,
    /// Index of the single task nothing depends on.
    sink: usize,
}

impl TaskGraph {
    /// Build and validate a graph from `(name, depends_on)` pairs.
    pub fn build(nodes: &[(String, Vec<String>)]) -> Result<Self, CrewConfigError> {
        if nodes.is_empty() {
            return Err(CrewConfigError::Empty);
        }

        let mut index: HashMap<&str, usize> = HashMap::new();
        for (i, (name, _)) in nodes.iter().enumerate() {
            if index.insert(name.as_str(), i).is_some() {
                return Err(CrewConfigError::DuplicateTask(name.clone()));
            }
        }

        let mut dependencies: Vec<Vec<usize>> = Vec::with_capacity(nodes.len());
        for (name, deps) in nodes {
            let mut resolved = Vec::new();
            let mut seen = HashSet::new();
            for dep in deps {
                let idx = *index.get(dep.as_str()).ok_or_else(|| CrewConfigError::UnknownDependency {
                    task: name.clone(),
                    dependency: dep.clone(),
                })?;
                if seen.insert(idx) {
                    resolved.push(idx);
                }
            }
            dependencies.push(resolved);
        }

        let layers = Self::resolve(&dependencies).map_err(|remaining| {
            CrewConfigError::Cycle(remaining.iter().map(|&i| nodes[i].0.clone()).collect())
        })?;

        let mut has_dependents = vec![false; nodes.len()];
        for deps in &dependencies {
            for &d in deps {
                has_dependents[d] = true;
            }
        }
        let sinks: Vec<usize> = (0..nodes.len()).filter(|&i| !has_dependents[i]).collect();
        if sinks.len() > 1 {
            return Err(CrewConfigError::MultipleSinks(
                sinks.iter().map(|&i| nodes[i].0.clone()).collect(),
            ));
        }
        // An acyclic non-empty graph always has at least one sink.
        let sink = sinks[0];

        Ok(Self {
            names: nodes.iter().map(|(n, _)| n.clone()).collect(),
            dependencies,
            layers,
            sink,
        })
    }

    /// Kahn's algorithm. On a cycle, returns the indices left unresolved.
    fn resolve(dependencies: &[Vec<usize>]) -> Result<Vec<Vec<usize>>, Vec<usize>> {
        let n = dependencies.len();
        let mut in_degree: Vec<usize> = dependencies.iter().map(Vec::len).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (task, deps) in dependencies.iter().enumerate() {
            for &d in deps {
                dependents[d].push(task);
            }
        }

        let mut current: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut layers = Vec::new();
        let mut placed = 0;

        while !current.is_empty() {
            let mut next = Vec::new();
            for &task in &current {
                for &dependent in &dependents[task] {
                    in_degree[dependent] -= 1;
                    if in_degree[dependent] == 0 {
                        next.push(dependent);
                    }
                }
            }
            placed += current.len();
            next.sort_unstable();
            layers.push(std::mem::replace(&mut current, next));
        }

        if placed < n {
            return Err((0..n).filter(|&i| in_degree[i] > 0).collect());
        }
        Ok(layers)
    }

    pub fn layers(&self) -> &[Vec<usize>] {
        &self.layers
    }

    pub fn dependencies(&self, task: usize) -> &[usize] {
        &self.dependencies[task]
    }

    pub fn sink(&self) -> usize {
        self.sink
    }

    pub fn name(&self, task: usize) -> &str {
        &self.names[task]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Layers rendered as task names, for logs and tests.
    pub fn layer_names(&self) -> Vec<Vec<String>> {
        self.layers
            .iter()
            .map(|layer| layer.iter().map(|&i| self.names[i].clone()).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(edges: &[(&str, &[&str])]) -> Vec<(String, Vec<String>)> {
        edges.iter()
            .map(|(n, deps)| (n.to_string(), deps.iter().map(|d| d.to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_pipeline_topology_layers() {
        let graph = TaskGraph::build(&nodes(&[
            ("trend_hunting_task", &[]),
            ("research_task", &[]),
            ("reporting_task", &["trend_hunting_task", "research_task"]),
            ("summarizing_task", &["reporting_task"]),
        ]))
        .unwrap();
        assert_eq!(
            graph.layer_names(),
            vec![
                vec!["trend_hunting_task".to_string(), "research_task".to_string()],
                vec!["reporting_task".to_string()],
                vec!["summarizing_task".to_string()],
            ]
        );
        assert_eq!(graph.name(graph.sink()), "summarizing_task");
        assert_eq!(graph.dependencies(2), &[0, 1]);
    }

    #[test]
    fn test_layers_are_valid_linearization() {
        // Declared out of order: dependents before their dependencies.
        let graph = TaskGraph::build(&nodes(&[
            ("d", &["b", "c"]),
            ("c", &["a"]),
            ("b", &["a"]),
            ("a", &[]),
        ]))
        .unwrap();
        let mut position = HashMap::new();
        for (layer_idx, layer) in graph.layers().iter().enumerate() {
            for &t in layer {
                position.insert(t, layer_idx);
            }
        }
        for t in 0..graph.len() {
            for &d in graph.dependencies(t) {
                assert!(position[&d] < position[&t]);
            }
        }
        assert_eq!(graph.layer_names()[1], vec!["c".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_cycle_rejected() {
        let err = TaskGraph::build(&nodes(&[("a", &["c"]), ("b", &["a"]), ("c", &["b"]), ("d", &[])]))
            .unwrap_err();
        assert_eq!(err, CrewConfigError::Cycle(vec!["a".into(), "b".into(), "c".into()]));
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let err = TaskGraph::build(&nodes(&[("a", &["a"])])).unwrap_err();
        assert!(matches!(err, CrewConfigError::Cycle(_)));
    }

    #[test]
    fn test_multiple_sinks_rejected() {
        let err = TaskGraph::build(&nodes(&[("a", &[]), ("b", &["a"]), ("c", &["a"])])).unwrap_err();
        assert_eq!(err, CrewConfigError::MultipleSinks(vec!["b".into(), "c".into()]));
    }

    #[test]
    fn test_unknown_dependency_and_duplicates() {
        assert!(matches!(
            TaskGraph::build(&nodes(&[("a", &["zzz"])])),
            Err(CrewConfigError::UnknownDependency { .. })
        ));
        assert_eq!(
            TaskGraph::build(&nodes(&[("a", &[]), ("a", &[])])),
            Err(CrewConfigError::DuplicateTask("a".into()))
        );
        assert_eq!(TaskGraph::build(&[]), Err(CrewConfigError::Empty));
    }

    #[test]
    fn test_repeated_dependency_deduplicated() {
        let graph = TaskGraph::build(&nodes(&[("a", &[]), ("b", &["a", "a"])])).unwrap();
        assert_eq!(graph.dependencies(1), &[0]);
        assert_eq!(graph.layers().len(), 2);
    }
}
