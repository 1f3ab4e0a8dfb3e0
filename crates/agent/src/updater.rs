use async_trait::async_trait;
use domainctx_core::types::{ChatMessage, LLMResponse};
use domainctx_core::{Error, Result};
use domainctx_providers::Provider;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::cache::SummaryCache;
use crate::prompt::PromptTemplate;
use crate::step::Verdict;
use crate::text::truncate_str;

const NO_EXISTING_CONTEXT: &str = "(none)";
const NO_VISIT_HISTORY: &str = "(no new steps in this domain)";

/// Anything that turns one prompt into a model response.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, prompt: &str) -> Result<LLMResponse>;
}

/// Adapts a chat [`Provider`] to the single-prompt [`Summarizer`] contract.
pub struct ProviderSummarizer {
    provider: Arc<dyn Provider>,
}

impl ProviderSummarizer {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Summarizer for ProviderSummarizer {
    async fn summarize(&self, prompt: &str) -> Result<LLMResponse> {
        let messages = vec![ChatMessage::user(prompt)];
        self.provider
            .chat(&messages)
            .await
            .map_err(|e| Error::Summarizer(e.to_string()))
    }
}

/// Inputs of one context update.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateRequest<'a> {
    pub domain: &'a str,
    pub prior_context: Option<&'a str>,
    pub visit_history: &'a str,
    pub task: Option<&'a str>,
    pub agent_history_summary: Option<&'a str>,
    pub verdict: Option<&'a Verdict>,
}

/// Produces updated domain contexts through the summarizer, consulting the
/// cache first.
pub struct ContextUpdater {
    summarizer: Arc<dyn Summarizer>,
    cache: Arc<SummaryCache>,
    template: PromptTemplate,
}

impl ContextUpdater {
    pub fn new(summarizer: Arc<dyn Summarizer>, cache: Arc<SummaryCache>, template: PromptTemplate) -> Self {
        Self {
            summarizer,
            cache,
            template,
        }
    }

    pub fn cache(&self) -> &SummaryCache {
        &self.cache
    }

    pub fn build_prompt(&self, req: &UpdateRequest<'_>) -> String {
        let existing = non_blank(req.prior_context).unwrap_or(NO_EXISTING_CONTEXT);
        let visit_history = non_blank(Some(req.visit_history)).unwrap_or(NO_VISIT_HISTORY);
        let conversation = conversation_block(req.task, req.agent_history_summary);
        let judge = req.verdict.map(verdict_block).unwrap_or_default();

        self.template.render(&[
            ("existing", existing),
            ("visit_history", visit_history),
            ("conversation_block", &conversation),
            ("judge_block", &judge),
        ])
    }

    /// Returns the updated context for `req.domain`. Summarizer failures are
    /// returned unchanged; nothing is retried here.
    pub async fn update(&self, req: &UpdateRequest<'_>) -> Result<String> {
        debug!(
            domain = %req.domain,
            existing_len = req.prior_context.map(str::len).unwrap_or(0),
            visit_history_len = req.visit_history.len(),
            "Updating domain context"
        );

        let key = SummaryCache::compute_key(
            req.domain,
            req.prior_context,
            req.visit_history,
            req.task,
            req.verdict,
        );
        if let Some(cached) = self.cache.get(&key) {
            info!(domain = %req.domain, "Using cached domain context update");
            return Ok(cached);
        }

        let prompt = self.build_prompt(req);
        let response = match self.summarizer.summarize(&prompt).await {
            Ok(r) => r,
            Err(e) => {
                error!(domain = %req.domain, error = %e, "Domain context summarization failed");
                return Err(e);
            }
        };

        let text = response.content_text();
        self.cache.put(&key, &text);
        debug!(domain = %req.domain, result_len = text.len(), "Domain context summarized");
        Ok(text)
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn conversation_block(task: Option<&str>, agent_history_summary: Option<&str>) -> String {
    let mut block = String::new();
    if let Some(task) = non_blank(task) {
        block.push_str("User intent (current task or relevant messages):\n---\n");
        block.push_str(task);
        block.push_str("\n---\n\n");
    }
    if let Some(summary) = non_blank(agent_history_summary) {
        block.push_str("Agent history summary (errors, results, URLs):\n---\n");
        block.push_str(summary);
        block.push_str("\n---\n");
    }
    block
}

fn verdict_block(verdict: &Verdict) -> String {
    let failure = truncate_str(verdict.failure_reason.as_deref().unwrap_or_default(), 150);
    let reasoning = truncate_str(verdict.reasoning.as_deref().unwrap_or_default(), 200);

    let mut block = format!(
        "\n\nFinal evaluation (the task has finished):\n---\nVerdict: {} | Failure: {}",
        verdict.label(),
        failure
    );
    if verdict.reached_captcha {
        block.push_str(" | Captcha: yes");
    }
    if verdict.impossible_task {
        block.push_str(" | Impossible: yes");
    }
    block.push('\n');
    if !reasoning.is_empty() {
        block.push_str(&format!("Reasoning: {}\n", reasoning));
    }
    block.push_str("---\n");
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use domainctx_core::types::{ContentPart, MessageContent};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct FakeSummarizer {
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
        response: LLMResponse,
    }

    impl FakeSummarizer {
        fn new(response: LLMResponse) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
                response,
            })
        }
    }

    #[async_trait]
    impl Summarizer for FakeSummarizer {
        async fn summarize(&self, prompt: &str) -> Result<LLMResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.response.clone())
        }
    }

    struct FailingSummarizer;

    #[async_trait]
    impl Summarizer for FailingSummarizer {
        async fn summarize(&self, _prompt: &str) -> Result<LLMResponse> {
            Err(Error::Summarizer("rate limited".to_string()))
        }
    }

    struct RejectingProvider;

    #[async_trait]
    impl Provider for RejectingProvider {
        async fn chat(&self, messages: &[ChatMessage]) -> Result<LLMResponse> {
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].role, "user");
            Err(Error::Provider("API error 429".to_string()))
        }
    }

    fn updater(summarizer: Arc<dyn Summarizer>, ttl: Duration) -> ContextUpdater {
        ContextUpdater::new(
            summarizer,
            Arc::new(SummaryCache::new(true, ttl)),
            PromptTemplate::new("E={existing}\nH={visit_history}\nC={conversation_block}J={judge_block}"),
        )
    }

    #[tokio::test]
    async fn test_identical_inputs_hit_cache_until_ttl() {
        let fake = FakeSummarizer::new(LLMResponse::text("merged"));
        let updater = updater(fake.clone(), Duration::from_millis(50));
        let req = UpdateRequest {
            domain: "a.com",
            prior_context: Some("old"),
            visit_history: "Step 1: URL=https://a.com",
            task: Some("find price"),
            ..UpdateRequest::default()
        };

        assert_eq!(updater.update(&req).await.unwrap(), "merged");
        assert_eq!(updater.update(&req).await.unwrap(), "merged");
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(120)).await;
        updater.update(&req).await.unwrap();
        assert_eq!(fake.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fragments_joined() {
        let response = LLMResponse {
            content: Some(MessageContent::Parts(vec![
                ContentPart { kind: "text".into(), text: Some("Use search.".into()) },
                ContentPart { kind: "text".into(), text: Some("Avoid /old.".into()) },
            ])),
            ..LLMResponse::default()
        };
        let updater = updater(FakeSummarizer::new(response), Duration::from_secs(60));
        let req = UpdateRequest { domain: "a.com", visit_history: "x", ..UpdateRequest::default() };
        assert_eq!(updater.update(&req).await.unwrap(), "Use search. Avoid /old.");
    }

    #[tokio::test]
    async fn test_failure_propagates_and_is_not_cached() {
        let updater = updater(Arc::new(FailingSummarizer), Duration::from_secs(60));
        let req = UpdateRequest { domain: "a.com", visit_history: "x", ..UpdateRequest::default() };
        assert!(matches!(updater.update(&req).await, Err(Error::Summarizer(_))));
        assert!(updater.cache().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_becomes_summarizer_error() {
        let summarizer = ProviderSummarizer::new(Arc::new(RejectingProvider));
        let err = summarizer.summarize("prompt").await.unwrap_err();
        assert!(matches!(err, Error::Summarizer(ref msg) if msg.contains("API error 429")));
    }

    #[test]
    fn test_prompt_markers_when_empty() {
        let updater = updater(FakeSummarizer::new(LLMResponse::default()), Duration::from_secs(1));
        let prompt = updater.build_prompt(&UpdateRequest {
            domain: "a.com",
            prior_context: Some("   "),
            visit_history: "",
            ..UpdateRequest::default()
        });
        assert_eq!(prompt, "E=(none)\nH=(no new steps in this domain)\nC=J=");
    }

    #[test]
    fn test_prompt_conversation_and_verdict_blocks() {
        let updater = updater(FakeSummarizer::new(LLMResponse::default()), Duration::from_secs(1));
        let verdict = Verdict {
            verdict: false,
            failure_reason: Some("f".repeat(300)),
            reached_captcha: true,
            impossible_task: false,
            reasoning: Some("r".repeat(300)),
        };
        let prompt = updater.build_prompt(&UpdateRequest {
            domain: "a.com",
            prior_context: Some("known"),
            visit_history: "Step 1",
            task: Some("  book a table  "),
            agent_history_summary: Some("URL: https://a.com"),
            verdict: Some(&verdict),
        });

        assert!(prompt.contains("User intent (current task or relevant messages):\n---\nbook a table\n---\n"));
        assert!(prompt.contains("Agent history summary (errors, results, URLs):\n---\nURL: https://a.com\n---\n"));
        let expected_verdict = format!(
            "Verdict: failure | Failure: {} | Captcha: yes\nReasoning: {}\n---\n",
            "f".repeat(150),
            "r".repeat(200)
        );
        assert!(prompt.contains(&expected_verdict));
        assert!(!prompt.contains("Impossible"));
    }
}
