pub mod domain_context;
pub mod registry;

use async_trait::async_trait;
use domainctx_core::Result;
use domainctx_storage::ContextStore;
use serde_json::Value;
use std::sync::Arc;

pub use domain_context::GetDomainContextTool;
pub use registry::ToolRegistry;

/// What a tool can see about the browsing session that invoked it.
#[derive(Clone)]
pub struct ToolContext {
    /// URL of the page the agent is currently on. May be empty.
    pub current_url: String,
    pub context_store: Arc<ContextStore>,
}

impl ToolContext {
    pub fn new(current_url: impl Into<String>, context_store: Arc<ContextStore>) -> Self {
        Self {
            current_url: current_url.into(),
            context_store,
        }
    }
}

pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn schema(&self) -> ToolSchema;
    fn validate(&self, params: &Value) -> Result<()>;
    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value>;
}
