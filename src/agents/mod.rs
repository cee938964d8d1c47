//! Agent execution internals: ReAct output parsing and the tool loop.

pub mod crew_agent_executor;
pub mod parser;

pub use crew_agent_executor::CrewAgentExecutor;
pub use parser::{parse, AgentAction, AgentFinish, OutputParserError, ParseResult};
