use async_trait::async_trait;
use domainctx_core::{extract_domain, Error, Result};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::{Tool, ToolContext, ToolSchema};

pub const NO_CONTEXT_MESSAGE: &str = "No saved context for this domain.";

/// Returns the accumulated context of the domain the agent is currently on.
pub struct GetDomainContextTool;

#[async_trait]
impl Tool for GetDomainContextTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_domain_context",
            description: "Get the saved context for the current domain. Call it before navigating to a new domain, right after arriving on one, and again every few steps on the same domain to pick up refreshed knowledge. The context holds proven routes, known problems to avoid and earlier findings about the site.",
            parameters: json!({
                "type": "object",
                "properties": {}
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        match params {
            Value::Null => Ok(()),
            Value::Object(map) if map.is_empty() => Ok(()),
            _ => Err(Error::Validation(
                "get_domain_context takes no parameters".to_string(),
            )),
        }
    }

    async fn execute(&self, ctx: ToolContext, _params: Value) -> Result<Value> {
        let domain = extract_domain(&ctx.current_url);
        debug!(domain = %domain, "get_domain_context invoked");

        let context = if domain.is_empty() {
            None
        } else {
            ctx.context_store.get(&domain).await?
        };

        match context.filter(|c| !c.trim().is_empty()) {
            Some(context) => {
                info!(domain = %domain, len = context.len(), "Domain context loaded by tool");
                Ok(json!({
                    "extracted_content": context,
                    "long_term_memory": format!("Context for {} loaded.", domain),
                    "include_extracted_content_only_once": true
                }))
            }
            None => Ok(json!({ "extracted_content": NO_CONTEXT_MESSAGE })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domainctx_storage::ContextStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> Arc<ContextStore> {
        Arc::new(ContextStore::new(dir.path().join("domains_context.json"), 2000))
    }

    #[tokio::test]
    async fn test_returns_stored_context() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.set("shop.example.com", "Use the top search bar.").await.unwrap();

        let ctx = ToolContext::new("https://www.Shop.example.com/cart", store);
        let out = GetDomainContextTool.execute(ctx, Value::Null).await.unwrap();
        assert_eq!(out["extracted_content"], "Use the top search bar.");
        assert_eq!(out["long_term_memory"], "Context for shop.example.com loaded.");
        assert_eq!(out["include_extracted_content_only_once"], true);
    }

    #[tokio::test]
    async fn test_missing_context_marker() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.set("a.com", "   ").await.unwrap();

        for url in ["https://a.com/", "https://unknown.org", "about:blank", ""] {
            let ctx = ToolContext::new(url, store.clone());
            let out = GetDomainContextTool.execute(ctx, json!({})).await.unwrap();
            assert_eq!(out, json!({ "extracted_content": NO_CONTEXT_MESSAGE }));
        }
    }

    #[test]
    fn test_validate_rejects_arguments() {
        assert!(GetDomainContextTool.validate(&json!({})).is_ok());
        assert!(GetDomainContextTool.validate(&Value::Null).is_ok());
        assert!(GetDomainContextTool.validate(&json!({"domain": "a.com"})).is_err());
    }
}
