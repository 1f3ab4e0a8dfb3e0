use domainctx_core::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain_context::GetDomainContextTool;
use crate::{Tool, ToolContext};

#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(GetDomainContextTool));
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let schema = tool.schema();
        debug!(name = schema.name, "Registering tool");
        self.tools.insert(schema.name.to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub async fn execute(&self, name: &str, ctx: ToolContext, params: Value) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::Tool(format!("Unknown tool: {}", name)))?;

        if let Err(e) = tool.validate(&params) {
            warn!(tool = name, error = %e, "Tool validation failed");
            return Err(e);
        }

        debug!(tool = name, "Executing tool");
        tool.execute(ctx, params).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domainctx_storage::ContextStore;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_registry_new_empty() {
        let reg = ToolRegistry::new();
        assert!(reg.tool_names().is_empty());
        assert!(reg.get("get_domain_context").is_none());
    }

    #[test]
    fn test_defaults_expose_domain_context_schema() {
        let reg = ToolRegistry::with_defaults();
        assert_eq!(reg.tool_names(), vec!["get_domain_context".to_string()]);
        let schema = reg.get("get_domain_context").unwrap().schema();
        assert_eq!(schema.name, "get_domain_context");
        assert_eq!(schema.parameters["properties"], json!({}));
    }

    #[tokio::test]
    async fn test_execute_rejects_arguments() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ContextStore::new(dir.path().join("c.json"), 100));
        let reg = ToolRegistry::with_defaults();
        let err = reg
            .execute("get_domain_context", ToolContext::new("https://a.com", store), json!({"x": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(ContextStore::new(dir.path().join("c.json"), 100));
        let reg = ToolRegistry::with_defaults();
        let err = reg
            .execute("exec", ToolContext::new("https://a.com", store), json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unknown tool: exec"));
    }
}
