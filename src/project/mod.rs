//! Declarative crew definitions.
//!
//! Agents and tasks are described in `agents.yaml` and `tasks.yaml`, keyed by
//! name. Definitions are loaded once at startup and validated by
//! [`CrewBuilder`] before anything runs: tool names must exist in the
//! [`ToolRegistry`], task agents and schemas must resolve, template
//! placeholders must name request inputs, and the task graph must be acyclic
//! with a single sink.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::crew::Crew;
use crate::crews::graph::CrewConfigError;
use crate::llms::base_llm::{BaseLLM, LLMConfig, LLMOverrides};
use crate::settings::ConfigError;
use crate::task::Task;
use crate::tasks::output_schema::OutputSchema;
use crate::tools::registry::ToolRegistry;
use crate::utilities::string_utils::template_variables;

pub const AGENTS_FILE: &str = "agents.yaml";
pub const TASKS_FILE: &str = "tasks.yaml";

/// Placeholders a content request fills in task templates.
pub const TEMPLATE_INPUTS: [&str; 3] = ["topic", "tone", "platform_guidelines"];

#[cfg(test)]
const BUILTIN_AGENTS: &str = include_str!("../../config/agents.yaml");
#[cfg(test)]
const BUILTIN_TASKS: &str = include_str!("../../config/tasks.yaml");

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// One entry of `agents.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    /// Tool names from the registry, in binding order.
    #[serde(default)]
    pub tools: Vec<String>,
    /// Per-agent completion overrides.
    #[serde(default)]
    pub llm: LLMOverrides,
    #[serde(default)]
    pub max_iter: Option<usize>,
    /// Upper bound on one run, in seconds.
    #[serde(default)]
    pub max_execution_time: Option<u64>,
}

/// One entry of `tasks.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub description: String,
    pub expected_output: String,
    /// Key of the agent in `agents.yaml`.
    pub agent: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub output_schema: Option<String>,
    #[serde(default)]
    pub markdown: bool,
}

/// Agents and tasks, each in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrewDefinition {
    pub agents: Vec<(String, AgentDefinition)>,
    pub tasks: Vec<(String, TaskDefinition)>,
}

impl CrewDefinition {
    /// Parse both documents.
    pub fn from_yaml(agents_yaml: &str, tasks_yaml: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            agents: parse_entries(agents_yaml, AGENTS_FILE)?,
            tasks: parse_entries(tasks_yaml, TASKS_FILE)?,
        })
    }

    /// The shipped `config/` pipeline.
    #[cfg(test)]
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_yaml(BUILTIN_AGENTS, BUILTIN_TASKS)
    }

    /// Load `agents.yaml` and `tasks.yaml` from `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self, ConfigError> {
        let read = |file: &str| {
            let path = dir.join(file);
            std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })
        };
        let agents = read(AGENTS_FILE)?;
        let tasks = read(TASKS_FILE)?;
        Self::from_yaml(&agents, &tasks)
    }

    /// Load from `dir`, degrading to an empty definition on any failure.
    pub fn load_or_empty(dir: &Path) -> Self {
        match Self::load_dir(dir) {
            Ok(definition) => {
                log::info!(
                    "Loaded {} agents and {} tasks from {}",
                    definition.agents.len(),
                    definition.tasks.len(),
                    dir.display()
                );
                definition
            }
            Err(e) => {
                log::warn!("Failed to load crew definitions: {e}; continuing with none");
                Self::default()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn agent(&self, name: &str) -> Option<&AgentDefinition> {
        self.agents.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }
}

/// Parse a name-keyed mapping, keeping document order.
fn parse_entries<T: DeserializeOwned>(yaml: &str, file: &str) -> Result<Vec<(String, T)>, ConfigError> {
    let yaml_error = |source| ConfigError::Yaml {
        path: file.to_string(),
        source,
    };
    let mapping: serde_yaml::Mapping = match serde_yaml::from_str::<Option<serde_yaml::Mapping>>(yaml) {
        Ok(mapping) => mapping.unwrap_or_default(),
        Err(e) => return Err(yaml_error(e)),
    };
    let mut entries = Vec::with_capacity(mapping.len());
    for (key, value) in mapping {
        let name = match key {
            serde_yaml::Value::String(s) => s,
            other => serde_yaml::to_string(&other)
                .map(|s| s.trim().to_string())
                .map_err(yaml_error)?,
        };
        let entry = serde_yaml::from_value(value).map_err(yaml_error)?;
        entries.push((name, entry));
    }
    Ok(entries)
}

// ---------------------------------------------------------------------------
// CrewBuilder
// ---------------------------------------------------------------------------

/// Turns a [`CrewDefinition`] into a validated [`Crew`].
pub struct CrewBuilder<'a> {
    definition: &'a CrewDefinition,
    tools: &'a ToolRegistry,
    llm: Arc<dyn BaseLLM>,
    llm_config: LLMConfig,
    inputs: Vec<String>,
}

impl<'a> CrewBuilder<'a> {
    pub fn new(
        definition: &'a CrewDefinition,
        tools: &'a ToolRegistry,
        llm: Arc<dyn BaseLLM>,
        llm_config: LLMConfig,
    ) -> Self {
        Self {
            definition,
            tools,
            llm,
            llm_config,
            inputs: TEMPLATE_INPUTS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replace the placeholder names templates may use.
    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    fn check_inputs(&self, task: &str, def: &TaskDefinition) -> Result<(), CrewConfigError> {
        let used = template_variables(&def.description)
            .into_iter()
            .chain(template_variables(&def.expected_output));
        for input in used {
            if !self.inputs.contains(&input) {
                return Err(CrewConfigError::UnknownInput {
                    task: task.to_string(),
                    input,
                });
            }
        }
        Ok(())
    }

    pub fn build(&self) -> Result<Crew, CrewConfigError> {
        let mut tasks = Vec::with_capacity(self.definition.tasks.len());
        for (name, def) in &self.definition.tasks {
            self.check_inputs(name, def)?;
            let agent_def = self
                .definition
                .agent(&def.agent)
                .ok_or_else(|| CrewConfigError::UnknownAgent {
                    task: name.clone(),
                    agent: def.agent.clone(),
                })?;
            let agent = Arc::new(self.build_agent(&def.agent, agent_def)?);

            let mut task = Task::new(
                name.clone(),
                def.description.trim(),
                def.expected_output.trim(),
                agent,
            )
            .with_dependencies(def.depends_on.iter().cloned())
            .with_markdown(def.markdown);
            if let Some(schema_name) = &def.output_schema {
                let schema = OutputSchema::by_name(schema_name).ok_or_else(|| {
                    CrewConfigError::UnknownSchema {
                        task: name.clone(),
                        schema: schema_name.clone(),
                    }
                })?;
                task = task.with_output_schema(schema);
            }
            tasks.push(task);
        }
        Crew::new(tasks)
    }

    fn build_agent(&self, name: &str, def: &AgentDefinition) -> Result<Agent, CrewConfigError> {
        let tools = def
            .tools
            .iter()
            .map(|tool| {
                self.tools.get(tool).ok_or_else(|| CrewConfigError::UnknownTool {
                    agent: name.to_string(),
                    tool: tool.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut agent = Agent::new(
            def.role.trim(),
            def.goal.trim(),
            def.backstory.trim(),
            self.llm.clone(),
            self.llm_config.merged(&def.llm),
        )
        .with_tools(tools)
        .with_max_execution_time(def.max_execution_time.map(Duration::from_secs));
        if let Some(max_iter) = def.max_iter {
            agent = agent.with_max_iter(max_iter);
        }
        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakePages, FakeSearch, FakeTrends, ScriptedLLM};
    use crate::tools::{TrendsTool, WebSearchTool};

    const AGENTS: &str = r#"
researcher:
  role: Researcher
  goal: Find facts
  backstory: Curious.
  tools: [web_search_tool]
  max_iter: 3
  llm:
    temperature: 0.1
writer:
  role: Writer
  goal: Write
  backstory: Fluent.
"#;

    const TASKS: &str = r#"
research:
  description: Research {topic}
  expected_output: Notes
  agent: researcher
write:
  description: Write about {topic}
  expected_output: Post
  agent: writer
  depends_on: [research]
  output_schema: blog_record
"#;

    fn registry() -> ToolRegistry {
        ToolRegistry::new()
            .with(Arc::new(WebSearchTool::new(
                Arc::new(FakeSearch::with_hits(vec![])),
                Arc::new(FakePages::new(&[])),
            )))
            .with(Arc::new(TrendsTool::new(Arc::new(FakeTrends::failing()))))
    }

    fn build(definition: &CrewDefinition) -> Result<Crew, CrewConfigError> {
        let registry = registry();
        CrewBuilder::new(
            definition,
            &registry,
            Arc::new(ScriptedLLM::new(vec![])),
            LLMConfig::new("m"),
        )
        .build()
    }

    #[test]
    fn test_parse_keeps_file_order() {
        let def = CrewDefinition::from_yaml(AGENTS, TASKS).unwrap();
        let names: Vec<&str> = def.tasks.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["research", "write"]);
        let researcher = def.agent("researcher").unwrap();
        assert_eq!(researcher.tools, vec!["web_search_tool"]);
        assert_eq!(researcher.llm.temperature, Some(0.1));
        assert_eq!(def.tasks[1].1.output_schema.as_deref(), Some("blog_record"));
    }

    #[test]
    fn test_build_crew() {
        let crew = build(&CrewDefinition::from_yaml(AGENTS, TASKS).unwrap()).unwrap();
        assert_eq!(crew.sink_name(), "write");
        let research = &crew.tasks()[0];
        assert_eq!(research.agent.tools.len(), 1);
        assert_eq!(research.agent.max_iter, 3);
        assert_eq!(research.agent.llm_config.temperature, Some(0.1));
        assert!(crew.tasks()[1].output_schema.is_some());
    }

    #[test]
    fn test_builtin_definition_builds_default_pipeline() {
        let def = CrewDefinition::builtin().unwrap();
        let registry = registry().with(Arc::new(crate::tools::RagTool::new(Arc::new(
            crate::rag::KnowledgeBase::new(
                Arc::new(crate::testing::KeywordEmbedding),
                Arc::new(crate::rag::InMemoryVectorStore::new()),
            ),
        ))));
        let crew = CrewBuilder::new(
            &def,
            &registry,
            Arc::new(ScriptedLLM::new(vec![])),
            LLMConfig::new("m"),
        )
        .build()
        .unwrap();
        assert_eq!(
            crew.graph().layer_names(),
            vec![
                vec!["trend_hunting_task".to_string(), "research_task".to_string()],
                vec!["reporting_task".to_string()],
                vec!["summarizing_task".to_string()],
            ]
        );
        assert_eq!(crew.tasks()[0].agent.role, "Trend Hunter");
    }

    #[test]
    fn test_unknown_references_rejected() {
        let tasks = TASKS.replace("agent: writer", "agent: ghost");
        let err = build(&CrewDefinition::from_yaml(AGENTS, &tasks).unwrap()).unwrap_err();
        assert!(matches!(err, CrewConfigError::UnknownAgent { ref agent, .. } if agent == "ghost"));

        let agents = AGENTS.replace("[web_search_tool]", "[rag_tool]");
        let err = build(&CrewDefinition::from_yaml(&agents, TASKS).unwrap()).unwrap_err();
        assert!(matches!(err, CrewConfigError::UnknownTool { ref tool, .. } if tool == "rag_tool"));

        let tasks = TASKS.replace("blog_record", "invoice");
        let err = build(&CrewDefinition::from_yaml(AGENTS, &tasks).unwrap()).unwrap_err();
        assert!(matches!(err, CrewConfigError::UnknownSchema { .. }));
    }

    #[test]
    fn test_unknown_template_input_rejected() {
        let tasks = TASKS.replace("Write about {topic}", "Write about {topic} for {audience}");
        let err = build(&CrewDefinition::from_yaml(AGENTS, &tasks).unwrap()).unwrap_err();
        assert_eq!(
            err,
            CrewConfigError::UnknownInput {
                task: "write".into(),
                input: "audience".into()
            }
        );

        let registry = registry();
        let crew = CrewBuilder::new(
            &CrewDefinition::from_yaml(AGENTS, &tasks).unwrap(),
            &registry,
            Arc::new(ScriptedLLM::new(vec![])),
            LLMConfig::new("m"),
        )
        .with_inputs(["topic", "audience"])
        .build();
        assert!(crew.is_ok());
    }

    #[test]
    fn test_cycle_in_definition_rejected() {
        let tasks = TASKS.replace("  agent: researcher\n", "  agent: researcher\n  depends_on: [write]\n");
        let err = build(&CrewDefinition::from_yaml(AGENTS, &tasks).unwrap()).unwrap_err();
        assert!(matches!(err, CrewConfigError::Cycle(_)));
    }

    #[test]
    fn test_load_dir_and_degrade() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(AGENTS_FILE), AGENTS).unwrap();
        std::fs::write(dir.path().join(TASKS_FILE), TASKS).unwrap();
        assert_eq!(CrewDefinition::load_or_empty(dir.path()).tasks.len(), 2);

        std::fs::write(dir.path().join(TASKS_FILE), "research: [not, a, task]").unwrap();
        assert!(matches!(CrewDefinition::load_dir(dir.path()), Err(ConfigError::Yaml { .. })));
        assert!(CrewDefinition::load_or_empty(dir.path()).is_empty());

        let missing = dir.path().join("nope");
        assert!(matches!(CrewDefinition::load_dir(&missing), Err(ConfigError::Io { .. })));
        assert!(CrewDefinition::load_or_empty(&missing).is_empty());
    }

    #[test]
    fn test_empty_definition_fails_to_build() {
        assert_eq!(build(&CrewDefinition::default()).unwrap_err(), CrewConfigError::Empty);
    }
}
