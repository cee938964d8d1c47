//! # blogcrew
//!
//! Blog post generation backend. A crew of LLM agents runs a dependency
//! graph of tasks (trend hunting and research in parallel, then writing,
//! then a schema-validated summary) with web search, Google Trends and a
//! retrieval-augmented knowledge base as tools. The final output is
//! recovered into a [`types::BlogRecord`] and served over an axum HTTP API
//! together with a conversational assistant and account endpoints.

pub mod agent;
pub mod agents;
pub mod auth;
pub mod chat;
pub mod crew;
pub mod crews;
pub mod llms;
pub mod pipeline;
pub mod project;
pub mod rag;
pub mod server;
pub mod settings;
pub mod task;
pub mod tasks;
pub mod tools;
pub mod types;
pub mod utilities;

#[cfg(test)]
mod testing;

pub use agent::Agent;
pub use crew::Crew;
pub use crews::crew_output::CrewOutput;
pub use llms::base_llm::BaseLLM;
pub use pipeline::ContentPipeline;
pub use task::Task;
pub use tasks::task_output::TaskOutput;
pub use types::{BlogRecord, BlogRequest, BlogResponse};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
