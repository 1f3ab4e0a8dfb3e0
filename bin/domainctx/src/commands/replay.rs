use anyhow::Context;
use domainctx_agent::{
    ChannelNotifier, ContextUpdater, DomainTracker, LoggingErrorHandler, PromptTemplate,
    ProviderSummarizer, StepEvent, SummaryCache, TrackerSettings, UpdateOutcome, Verdict,
};
use domainctx_providers::{create_provider, Provider};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::open_store;

/// Feed recorded step events through a tracker backed by the configured
/// provider, then finalize with the optional verdict.
pub async fn run(events: &Path, task: Option<&str>, verdict: Option<&str>) -> anyhow::Result<()> {
    let (paths, config, store) = open_store()?;
    let dc = &config.domain_context;

    let verdict: Option<Verdict> = verdict
        .map(|raw| serde_json::from_str::<Verdict>(raw))
        .transpose()
        .context("Invalid --verdict JSON")?;

    let content = tokio::fs::read_to_string(events)
        .await
        .with_context(|| format!("Failed to read {}", events.display()))?;
    let steps = parse_events(&content)?;

    let provider: Arc<dyn Provider> = Arc::from(create_provider(&config)?);
    let template = PromptTemplate::load_or_builtin(&dc.prompt_template_path(&paths))?;
    let updater = Arc::new(ContextUpdater::new(
        Arc::new(ProviderSummarizer::new(provider)),
        Arc::new(SummaryCache::from_settings(&dc.cache)),
        template,
    ));

    let (notifier, mut rx) = ChannelNotifier::channel(64);
    let printer = tokio::spawn(async move {
        while let Some(n) = rx.recv().await {
            match n.label {
                Some(label) => println!("  [{}] {}", label, n.message),
                None => println!("  {}", n.message),
            }
        }
    });

    let mut tracker = DomainTracker::new(
        TrackerSettings::from(dc),
        store.clone(),
        updater,
        Arc::new(notifier),
        Arc::new(LoggingErrorHandler::new(dc.suppress_expected_errors)),
    );

    info!(steps = steps.len(), file = %events.display(), "Replaying step events");
    for event in &steps {
        for update in tracker.track_step(event, task).await {
            println!(
                "  → {} update for {}: {}",
                update.operation,
                update.domain,
                describe(&update.outcome)
            );
        }
    }

    if let Some(outcome) = tracker.finalize_with_judge(verdict.as_ref(), task).await {
        let domain = tracker.tracked_domain().unwrap_or_default();
        println!("  → final update for {}: {}", domain, describe(&outcome));
    }

    let domains = tracker.visited_domains().count();
    drop(tracker);
    if let Err(e) = printer.await {
        warn!(error = %e, "Notification printer stopped unexpectedly");
    }

    println!();
    println!("✅ Replayed {} steps across {} domains", steps.len(), domains);
    println!("  Store: {}", store.path().display());
    Ok(())
}

fn parse_events(content: &str) -> anyhow::Result<Vec<StepEvent>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<StepEvent>(line)
                .with_context(|| format!("Invalid step event on line {}", i + 1))
        })
        .collect()
}

fn describe(outcome: &UpdateOutcome) -> String {
    match outcome {
        UpdateOutcome::Saved { chars } => format!("saved ({} chars)", chars),
        UpdateOutcome::Skipped => "skipped (empty summary)".to_string(),
        UpdateOutcome::Failed(reason) => format!("failed ({})", reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_events_skips_blank_lines() {
        let raw = "{\"url\": \"https://a.com/\"}\n\n{\"url\": \"https://b.com/\", \"step_number\": 7}\n";
        let events = parse_events(raw).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].step_number, Some(7));
    }

    #[test]
    fn test_parse_events_reports_line() {
        let err = parse_events("{\"url\": \"x\"}\nnot json").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
