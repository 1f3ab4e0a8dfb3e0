//! Visit lines and the per-domain visit buffer.

use serde_json::Value;

use crate::step::{PlannedAction, StepEvent, StepResult};
use crate::text::clip;

/// Bounded, ordered visit lines for the domain currently being tracked.
///
/// `sent` counts the leading lines already handed to a refresh update, so the
/// next refresh only carries what came after them.
#[derive(Debug, Clone)]
pub struct VisitBuffer {
    lines: Vec<String>,
    sent: usize,
    capacity: usize,
}

impl VisitBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Vec::new(),
            sent: 0,
            capacity: capacity.max(1),
        }
    }

    /// Appends a line, evicting the oldest ones beyond capacity. The cursor
    /// shifts with the evicted lines and never exceeds the buffer length.
    pub fn push(&mut self, line: String) {
        self.lines.push(line);
        if self.lines.len() > self.capacity {
            let evicted = self.lines.len() - self.capacity;
            self.lines.drain(..evicted);
            self.sent = self.sent.saturating_sub(evicted);
        }
        self.sent = self.sent.min(self.lines.len());
    }

    /// All buffered lines joined with newlines.
    pub fn joined(&self) -> String {
        self.lines.join("\n")
    }

    /// Lines after the cursor, joined, and the cursor moved to the end.
    pub fn take_delta(&mut self) -> String {
        let delta = self.lines[self.sent..].join("\n");
        self.sent = self.lines.len();
        delta
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.sent = 0;
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn sent(&self) -> usize {
        self.sent
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// Compact action summary: `click(42),navigate(https://...),input(3,"abc")`.
pub fn summarize_actions(actions: &[PlannedAction]) -> String {
    actions
        .iter()
        .map(summarize_action)
        .collect::<Vec<_>>()
        .join(",")
}

fn summarize_action(action: &PlannedAction) -> String {
    let index = action.params.get("index").filter(|v| !v.is_null());
    match action.kind.as_str() {
        "click" => match index {
            Some(idx) => format!("click({})", scalar(idx)),
            None => "click".to_string(),
        },
        "navigate" => {
            let url = action.navigate_url().unwrap_or_default();
            format!("navigate({})", clip(url, 60))
        }
        "input" => {
            let text = action.param_str("text").unwrap_or_default();
            let text = format!("{:?}", clip(text, 20));
            match index {
                Some(idx) => format!("input({},{})", scalar(idx), text),
                None => format!("input({})", text),
            }
        }
        "scroll_up" | "scroll_down" | "done" | "wait" => action.kind.clone(),
        other => format!("{}(...)", other),
    }
}

fn scalar(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Extracted content, overall success and errors of the previous step's
/// action results.
fn digest_results(results: &[StepResult]) -> (Vec<String>, Option<bool>, Vec<String>) {
    let mut extracted = Vec::new();
    let mut success = None;
    let mut errors = Vec::new();

    for result in results {
        if let Some(outcome) = result.outcome() {
            success = Some(outcome);
        }
        if let Some(content) = result.extracted_content.as_deref().filter(|c| !c.is_empty()) {
            extracted.push(clip(content, 200));
        }
        if let Some(err) = result.error_text() {
            errors.push(clip(err, 150));
        }
    }
    (extracted, success, errors)
}

/// Formats one step as a single visit line.
pub fn format_visit_line(step_number: u32, event: &StepEvent) -> String {
    let mut parts = vec![format!("Step {}: URL={}", step_number, event.url)];

    if !event.title.is_empty() {
        parts.push(format!("Title={}", event.title));
    }
    if !event.next_goal.is_empty() {
        parts.push(format!("Goal={}", event.next_goal));
    }
    if !event.evaluation_previous_goal.is_empty() {
        parts.push(format!("Evaluation={}", event.evaluation_previous_goal));
    }
    let actions = summarize_actions(&event.actions);
    if !actions.is_empty() {
        parts.push(format!("Actions={}", actions));
    }

    let (extracted, success, errors) = digest_results(&event.results);
    if let Some(ok) = success {
        let mut result = format!("Result={}", if ok { "✓" } else { "✗" });
        if let Some(first) = errors.first() {
            result.push_str(&format!(" [error: {}]", first));
        }
        parts.push(result);
    }
    if !extracted.is_empty() {
        let shown: Vec<&str> = extracted.iter().take(2).map(String::as_str).collect();
        parts.push(format!("Extracted={}", shown.join(" | ")));
    }
    if !event.memory.is_empty() {
        parts.push(format!("Memory={}", clip(&event.memory, 100)));
    }
    if !event.browser_errors.is_empty() {
        let errs: Vec<String> = event
            .browser_errors
            .iter()
            .take(2)
            .map(|e| clip(e, 100))
            .collect();
        parts.push(format!("Errors={}", errs.join("; ")));
    }

    parts.join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_buffer_evicts_oldest_and_clamps_cursor() {
        let mut buf = VisitBuffer::new(3);
        for i in 0..3 {
            buf.push(format!("line {}", i));
        }
        assert_eq!(buf.take_delta(), "line 0\nline 1\nline 2");
        assert_eq!(buf.sent(), 3);

        buf.push("line 3".into());
        buf.push("line 4".into());
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.lines()[0], "line 2");
        assert_eq!(buf.sent(), 1);
        assert_eq!(buf.take_delta(), "line 3\nline 4");

        for i in 5..20 {
            buf.push(format!("line {}", i));
            assert!(buf.sent() <= buf.len());
            assert!(buf.len() <= 3);
        }
        assert_eq!(buf.lines(), &["line 17", "line 18", "line 19"]);
    }

    #[test]
    fn test_delta_empty_after_full_send() {
        let mut buf = VisitBuffer::new(5);
        buf.push("a".into());
        buf.take_delta();
        assert_eq!(buf.take_delta(), "");
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.sent(), 0);
    }

    #[test]
    fn test_summarize_actions() {
        let long_url = format!("https://example.com/{}", "a".repeat(80));
        let actions = vec![
            PlannedAction::new("click", json!({"index": 42})),
            PlannedAction::navigate(&long_url),
            PlannedAction::new("input", json!({"index": 3, "text": "a very long search query text"})),
            PlannedAction::new("scroll_down", json!({})),
            PlannedAction::new("extract_structured_data", json!({"query": "x"})),
            PlannedAction::new("click", Value::Null),
        ];
        let expected = format!(
            "click(42),navigate(https://example.com/{}...),input(3,\"a very long search q...\"),\
             scroll_down,extract_structured_data(...),click",
            "a".repeat(40)
        );
        assert_eq!(summarize_actions(&actions), expected);
    }

    #[test]
    fn test_format_visit_line() {
        let event = StepEvent {
            url: "https://www.example.com/login".into(),
            title: "Sign in".into(),
            next_goal: "Submit the form".into(),
            evaluation_previous_goal: "Form filled".into(),
            memory: "User is on login page".into(),
            actions: vec![PlannedAction::new("click", json!({"index": 7}))],
            browser_errors: vec!["net::ERR_ABORTED".into()],
            results: vec![
                StepResult {
                    extracted_content: Some("Welcome banner".into()),
                    success: Some(true),
                    ..StepResult::default()
                },
                StepResult {
                    error: Some("  element not found  ".into()),
                    success: Some(false),
                    ..StepResult::default()
                },
            ],
            ..StepEvent::default()
        };
        let line = format_visit_line(4, &event);
        assert_eq!(
            line,
            "Step 4: URL=https://www.example.com/login | Title=Sign in | Goal=Submit the form \
             | Evaluation=Form filled | Actions=click(7) | Result=✗ [error: element not found] \
             | Extracted=Welcome banner | Memory=User is on login page | Errors=net::ERR_ABORTED"
        );
    }

    #[test]
    fn test_format_minimal_line() {
        let line = format_visit_line(1, &StepEvent::new("https://a.com/"));
        assert_eq!(line, "Step 1: URL=https://a.com/");
    }
}
