use chrono::Local;
use domainctx_core::Result;
use std::path::Path;
use tracing::{debug, info};

const BUILTIN_TEMPLATE: &str = r#"<role>
You maintain a knowledge base about how to operate a specific website. Today is {current_date}.
</role>

<instructions>
Merge the existing knowledge with the new visit history into ONE updated summary for this domain.
- Keep routes that worked (menus, URLs, buttons, form fields) and how to reach them quickly.
- Record pitfalls: errors, captchas, pop-ups, dead ends, slow pages, login walls.
- Drop facts contradicted by the new evidence. Do not invent anything.
- If a final evaluation is present, trust it to decide which routes actually worked.
- Plain text, short bullet points, no preamble.
</instructions>

<existing_context>
{existing}
</existing_context>

<visit_history>
{visit_history}
</visit_history>

{conversation_block}{judge_block}
Return only the updated domain context."#;

/// Prompt used to ask the summarizer for an updated domain context.
///
/// Placeholders are written `{name}`; `{{` and `}}` produce literal braces.
/// `{current_date}` is filled in when the template is loaded.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }

    pub fn builtin() -> Self {
        Self::new(&with_current_date(BUILTIN_TEMPLATE))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "Loaded domain context prompt");
        Ok(Self::new(&with_current_date(&content)))
    }

    /// Loads `path` when it exists, otherwise the built-in template.
    pub fn load_or_builtin(path: &Path) -> Result<Self> {
        if path.exists() {
            info!(path = %path.display(), "Using custom domain context prompt");
            Self::load(path)
        } else {
            Ok(Self::builtin())
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Substitutes `vars` in a single pass. Unknown placeholders are left as
    /// they are, and substituted values are never expanded again.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        let src = self.text.as_str();
        let mut out = String::with_capacity(src.len());
        let mut rest = src;

        while let Some(pos) = rest.find(&['{', '}'][..]) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if tail.starts_with("{{") {
                out.push('{');
                rest = &tail[2..];
                continue;
            }
            if tail.starts_with("}}") {
                out.push('}');
                rest = &tail[2..];
                continue;
            }
            if tail.starts_with('{') {
                if let Some(end) = tail.find('}') {
                    let name = &tail[1..end];
                    if let Some((_, value)) = vars.iter().find(|(k, _)| *k == name) {
                        out.push_str(value);
                        rest = &tail[end + 1..];
                        continue;
                    }
                }
            }
            out.push_str(&tail[..1]);
            rest = &tail[1..];
        }
        out.push_str(rest);
        out
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::builtin()
    }
}

fn with_current_date(template: &str) -> String {
    let today = Local::now().format("%Y-%m-%d").to_string();
    template.replace("{current_date}", &today)
}
