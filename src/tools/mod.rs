//! Tools agents can call.
//!
//! Every tool implements [`BaseTool`]: `query -> text report`, with internal
//! failures rendered as text rather than propagated.

pub mod base_tool;
pub mod rag_tool;
pub mod registry;
pub mod trends_tool;
pub mod web_search_tool;

pub use base_tool::{BaseTool, ToolError, ToolInput};
pub use rag_tool::RagTool;
pub use registry::ToolRegistry;
pub use trends_tool::{GoogleTrendsClient, TrendsTool};
pub use web_search_tool::{DuckDuckGoSearch, WebSearchTool};
