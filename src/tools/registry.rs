//! Name → tool lookup used when binding tools to agents from definitions.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::tools::base_tool::BaseTool;

#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn BaseTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its own name, replacing any previous entry.
    pub fn register(&mut self, tool: Arc<dyn BaseTool>) -> &mut Self {
        self.tools.insert(tool.name().to_string(), tool);
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, tool: Arc<dyn BaseTool>) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn BaseTool>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTrends;
    use crate::tools::TrendsTool;

    #[test]
    fn test_register_and_get() {
        let registry = ToolRegistry::new().with(Arc::new(TrendsTool::new(Arc::new(FakeTrends::failing()))));
        assert!(registry.get("google_trends_tool").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.names(), vec!["google_trends_tool"]);
    }
}
