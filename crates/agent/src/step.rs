//! Step events fed to the tracker and the final run verdict.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One action the navigation agent planned for this step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannedAction {
    /// Action name: `navigate`, `click`, `input`, `scroll_down`, `done`...
    #[serde(alias = "name")]
    pub kind: String,
    #[serde(default)]
    pub params: Value,
}

impl PlannedAction {
    pub fn new(kind: &str, params: Value) -> Self {
        Self {
            kind: kind.to_string(),
            params,
        }
    }

    pub fn navigate(url: &str) -> Self {
        Self::new("navigate", serde_json::json!({ "url": url }))
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    /// Target URL of a `navigate` action.
    pub fn navigate_url(&self) -> Option<&str> {
        if self.kind != "navigate" {
            return None;
        }
        self.param_str("url")
            .or_else(|| self.params.as_str())
            .filter(|u| !u.trim().is_empty())
    }
}

/// Outcome of one action executed in the previous step. Adapters fill what
/// their agent framework reports; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepResult {
    #[serde(alias = "extractedContent")]
    pub extracted_content: Option<String>,
    pub error: Option<String>,
    pub success: Option<bool>,
    pub is_done: Option<bool>,
}

impl StepResult {
    /// `is_done` takes precedence over `success`.
    pub fn outcome(&self) -> Option<bool> {
        self.is_done.or(self.success)
    }

    pub fn error_text(&self) -> Option<&str> {
        self.error.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}

/// Everything the tracker needs to know about one navigation step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepEvent {
    pub step_number: Option<u32>,
    pub url: String,
    pub title: String,
    pub next_goal: String,
    pub evaluation_previous_goal: String,
    pub memory: String,
    pub actions: Vec<PlannedAction>,
    pub browser_errors: Vec<String>,
    /// Results of the actions executed in the previous step.
    pub results: Vec<StepResult>,
}

impl StepEvent {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            ..Self::default()
        }
    }
}

/// Final assessment of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Verdict {
    /// Whether the task was accomplished.
    pub verdict: bool,
    pub failure_reason: Option<String>,
    pub reached_captcha: bool,
    pub impossible_task: bool,
    pub reasoning: Option<String>,
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        if self.verdict {
            "success"
        } else {
            "failure"
        }
    }

    /// Compact JSON with sorted keys.
    pub fn to_sorted_json(&self) -> String {
        // serde_json's default map is ordered by key.
        serde_json::to_value(self)
            .map(|v| v.to_string())
            .unwrap_or_default()
    }
}
