use async_trait::async_trait;
use domainctx_core::types::{ChatMessage, ContentPart, LLMResponse, MessageContent};
use domainctx_core::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::client::build_http_client;
use crate::Provider;

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicProvider {
    pub fn new(
        api_key: &str,
        api_base: Option<&str>,
        model: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self::new_with_proxy(
            api_key,
            api_base,
            model,
            max_tokens,
            temperature,
            None,
            None,
            &[],
            Duration::from_secs(120),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new_with_proxy(
        api_key: &str,
        api_base: Option<&str>,
        model: &str,
        max_tokens: u32,
        temperature: f32,
        provider_proxy: Option<&str>,
        global_proxy: Option<&str>,
        no_proxy: &[String],
        timeout: Duration,
    ) -> Self {
        let api_base = api_base
            .unwrap_or(ANTHROPIC_API_BASE)
            .trim_end_matches('/')
            .to_string();
        Self {
            client: build_http_client(provider_proxy, global_proxy, no_proxy, &api_base, timeout),
            api_key: api_key.to_string(),
            api_base,
            model: model.to_string(),
            max_tokens,
            temperature,
        }
    }

    /// Config may store "anthropic/claude-..." but the API expects the bare id.
    fn normalize_model(model: &str) -> &str {
        model.strip_prefix("anthropic/").unwrap_or(model)
    }

    /// Splits system messages out into the top-level `system` field.
    fn convert_messages(messages: &[ChatMessage]) -> (Option<String>, Vec<Value>) {
        let mut system_parts = Vec::new();
        let mut converted = Vec::new();
        for msg in messages {
            if msg.role == "system" {
                system_parts.push(msg.content.clone());
            } else {
                converted.push(serde_json::json!({
                    "role": msg.role,
                    "content": msg.content,
                }));
            }
        }
        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };
        (system, converted)
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}

fn into_llm_response(resp: AnthropicResponse) -> LLMResponse {
    // Text blocks are kept as fragments; callers flatten them.
    let parts: Vec<ContentPart> = resp
        .content
        .into_iter()
        .filter(|b| b.block_type == "text")
        .map(|b| ContentPart {
            kind: b.block_type,
            text: b.text,
        })
        .collect();

    let finish_reason = match resp.stop_reason.as_deref() {
        Some("end_turn") | None => "stop".to_string(),
        Some("max_tokens") => "length".to_string(),
        Some(other) => other.to_string(),
    };

    let usage = serde_json::json!({
        "prompt_tokens": resp.usage.as_ref().and_then(|u| u.input_tokens),
        "completion_tokens": resp.usage.as_ref().and_then(|u| u.output_tokens),
    });

    LLMResponse {
        content: if parts.is_empty() {
            None
        } else {
            Some(MessageContent::Parts(parts))
        },
        finish_reason,
        usage,
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<LLMResponse> {
        let url = format!("{}/messages", self.api_base);
        let model = Self::normalize_model(&self.model);
        let (system, anthropic_messages) = Self::convert_messages(messages);

        let mut request = serde_json::json!({
            "model": model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "messages": anthropic_messages,
        });
        if let Some(sys) = system {
            request["system"] = Value::String(sys);
        }

        info!(url = %url, model = %model, messages_count = messages.len(), "Calling Anthropic API");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Anthropic request failed: {}", e)))?;

        let status = response.status();
        let raw_body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            error!(status = %status, body = %raw_body, "Anthropic API error");
            return Err(Error::Provider(format!("Anthropic API error {}: {}", status, raw_body)));
        }

        debug!(body_len = raw_body.len(), "Anthropic raw response");

        let resp: AnthropicResponse = serde_json::from_str(&raw_body).map_err(|e| {
            let preview: String = raw_body.chars().take(500).collect();
            Error::Provider(format!("Failed to parse Anthropic response: {}. Body: {}", e, preview))
        })?;

        Ok(into_llm_response(resp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_model() {
        assert_eq!(
            AnthropicProvider::normalize_model("anthropic/claude-3-5-haiku-latest"),
            "claude-3-5-haiku-latest"
        );
        assert_eq!(AnthropicProvider::normalize_model("claude-3-opus"), "claude-3-opus");
    }

    #[test]
    fn test_convert_messages_system_extraction() {
        let messages = vec![ChatMessage::system("Be brief."), ChatMessage::user("Summarize.")];
        let (system, converted) = AnthropicProvider::convert_messages(&messages);
        assert_eq!(system.as_deref(), Some("Be brief."));
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0]["role"], "user");
    }

    #[test]
    fn test_response_keeps_text_fragments() {
        let json = r#"{
            "id": "msg_1",
            "content": [
                {"type": "text", "text": "Login is under /conta."},
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "Captcha on submit."}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 120, "output_tokens": 30}
        }"#;
        let resp: AnthropicResponse = serde_json::from_str(json).unwrap();
        let llm = into_llm_response(resp);
        assert!(matches!(llm.content, Some(MessageContent::Parts(ref p)) if p.len() == 2));
        assert_eq!(llm.content_text(), "Login is under /conta. Captcha on submit.");
        assert_eq!(llm.finish_reason, "stop");
        assert_eq!(llm.usage["completion_tokens"], 30);
    }
}
