use serde::{Deserialize, Serialize};

/// One fragment of a multi-part model response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Response payload as returned by a provider: either a single text or a
/// list of fragments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Flattens the payload to plain text. Fragments without text are
    /// skipped and the rest are joined with single spaces.
    pub fn to_text(&self) -> String {
        match self {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        MessageContent::Text(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: Option<MessageContent>,
    pub finish_reason: String,
    pub usage: serde_json::Value,
}

impl LLMResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(MessageContent::Text(content.into())),
            ..Self::default()
        }
    }

    /// Plain text of the response, empty when there is no content.
    pub fn content_text(&self) -> String {
        self.content.as_ref().map(MessageContent::to_text).unwrap_or_default()
    }
}

impl Default for LLMResponse {
    fn default() -> Self {
        Self {
            content: None,
            finish_reason: String::new(),
            usage: serde_json::Value::Null,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts_joined_with_spaces() {
        let raw = r#"[{"type":"text","text":"Login at /auth."},{"type":"image"},{"type":"text","text":"Avoid popups."}]"#;
        let content: MessageContent = serde_json::from_str(raw).unwrap();
        assert_eq!(content.to_text(), "Login at /auth. Avoid popups.");
    }

    #[test]
    fn test_missing_content_is_empty() {
        assert_eq!(LLMResponse::default().content_text(), "");
        assert_eq!(LLMResponse::text("ok").content_text(), "ok");
    }
}
