use domainctx_core::{extract_domain, DomainContextConfig, Result};
use domainctx_storage::ContextStore;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::error_handler::{UpdateErrorHandler, UpdateOperation};
use crate::notify::{Notification, NotificationRole, NotificationSink, COLOR_INFO, COLOR_THINKING};
use crate::step::{StepEvent, Verdict};
use crate::text::clip_within;
use crate::updater::{ContextUpdater, UpdateRequest};
use crate::visit::{format_visit_line, VisitBuffer};

const NO_STEPS: &str = "(no steps)";
const NO_NEW_STEPS: &str = "(no new steps)";
const RECENT_STEPS: usize = 10;
const MAX_SUMMARY_LINES: usize = 8;
const MAX_FINAL_URLS: usize = 6;

#[derive(Debug, Clone, Copy)]
pub struct TrackerSettings {
    pub min_steps_for_update: u32,
    pub refresh_steps: u32,
    pub max_visit_history_steps: usize,
    /// Log every step at info instead of debug.
    pub trace_steps: bool,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self::from(&DomainContextConfig::default())
    }
}

impl From<&DomainContextConfig> for TrackerSettings {
    fn from(cfg: &DomainContextConfig) -> Self {
        Self {
            min_steps_for_update: cfg.min_steps_for_update,
            refresh_steps: cfg.refresh_steps.max(1),
            max_visit_history_steps: cfg.max_visit_history_steps.max(1),
            trace_steps: cfg.trace_steps,
        }
    }
}

/// Result of one triggered context update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// A new context was stored.
    Saved { chars: usize },
    /// The summarizer returned nothing usable; the stored context is untouched.
    Skipped,
    /// The update failed and was reported; the stored context is untouched.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggeredUpdate {
    pub domain: String,
    pub operation: UpdateOperation,
    pub outcome: UpdateOutcome,
}

#[derive(Debug, Clone)]
struct RecentStep {
    url: String,
    errors: Vec<String>,
}

#[derive(Debug)]
struct TrackerState {
    previous_domain: Option<String>,
    buffered_domain: Option<String>,
    steps_since_refresh: u32,
    steps_per_domain: HashMap<String, u32>,
    visited_domains: BTreeSet<String>,
    buffer: VisitBuffer,
    recent: VecDeque<RecentStep>,
    steps_seen: u32,
}

impl TrackerState {
    fn new(buffer_capacity: usize) -> Self {
        Self {
            previous_domain: None,
            buffered_domain: None,
            steps_since_refresh: 0,
            steps_per_domain: HashMap::new(),
            visited_domains: BTreeSet::new(),
            buffer: VisitBuffer::new(buffer_capacity),
            recent: VecDeque::with_capacity(RECENT_STEPS),
            steps_seen: 0,
        }
    }
}

/// Per-run state machine that turns navigation steps into domain context
/// updates.
///
/// Leaving a domain after enough steps sends its whole buffer; staying in a
/// domain for `refresh_steps` sends only the lines not sent yet. One tracker
/// serves one run and is driven by one caller at a time.
pub struct DomainTracker {
    settings: TrackerSettings,
    store: Arc<ContextStore>,
    updater: Arc<ContextUpdater>,
    notifier: Arc<dyn NotificationSink>,
    errors: Arc<dyn UpdateErrorHandler>,
    state: TrackerState,
}

impl DomainTracker {
    pub fn new(
        settings: TrackerSettings,
        store: Arc<ContextStore>,
        updater: Arc<ContextUpdater>,
        notifier: Arc<dyn NotificationSink>,
        errors: Arc<dyn UpdateErrorHandler>,
    ) -> Self {
        Self {
            state: TrackerState::new(settings.max_visit_history_steps),
            settings,
            store,
            updater,
            notifier,
            errors,
        }
    }

    /// The domain currently being tracked, `None` while idle.
    pub fn tracked_domain(&self) -> Option<&str> {
        self.state.previous_domain.as_deref()
    }

    pub fn visited_domains(&self) -> impl Iterator<Item = &str> {
        self.state.visited_domains.iter().map(String::as_str)
    }

    pub fn buffered_lines(&self) -> &[String] {
        self.state.buffer.lines()
    }

    pub fn steps_in_domain(&self, domain: &str) -> u32 {
        self.state.steps_per_domain.get(domain).copied().unwrap_or(0)
    }

    /// Processes one navigation step. Never fails: problems are reported to
    /// the error handler and the step is otherwise skipped.
    pub async fn track_step(&mut self, event: &StepEvent, task: Option<&str>) -> Vec<TriggeredUpdate> {
        match self.try_track_step(event, task).await {
            Ok(updates) => updates,
            Err(e) => {
                error!(url = %event.url, error = %e, "Domain tracking failed for step");
                self.errors.report(&e, "", UpdateOperation::TrackStep);
                Vec::new()
            }
        }
    }

    async fn try_track_step(&mut self, event: &StepEvent, task: Option<&str>) -> Result<Vec<TriggeredUpdate>> {
        self.state.steps_seen += 1;
        let step_number = event.step_number.unwrap_or(self.state.steps_seen);
        let current = extract_domain(&event.url);

        if self.settings.trace_steps {
            info!(step = step_number, url = %event.url, domain = %current, "track_step");
        } else {
            debug!(step = step_number, url = %event.url, domain = %current, "track_step");
        }

        self.announce_known_targets(event, &current).await?;

        if !current.is_empty() {
            self.state.visited_domains.insert(current.clone());
        }

        let mut exit: Option<(String, String)> = None;
        let mut refresh: Option<(String, String)> = None;

        let previous = self.state.previous_domain.clone();
        if let Some(prev) = previous.filter(|p| !current.is_empty() && *p != current) {
            debug!(from = %prev, to = %current, "Domain changed");
            let steps = self.steps_in_domain(&prev);
            if steps >= self.settings.min_steps_for_update {
                let history = if self.state.buffer.is_empty() {
                    NO_STEPS.to_string()
                } else {
                    self.state.buffer.joined()
                };
                exit = Some((prev, history));
            }
            self.state.buffer.clear();
            self.state.steps_since_refresh = 0;
            self.state.steps_per_domain.insert(current.clone(), 0);
        }

        if !current.is_empty() {
            self.state.buffer.push(format_visit_line(step_number, event));
            *self.state.steps_per_domain.entry(current.clone()).or_insert(0) += 1;

            if self.state.buffered_domain.as_deref() == Some(current.as_str()) {
                self.state.steps_since_refresh += 1;
            } else {
                self.state.buffered_domain = Some(current.clone());
                self.state.steps_since_refresh = 1;
            }

            if self.state.steps_since_refresh >= self.settings.refresh_steps {
                let delta = self.state.buffer.take_delta();
                let delta = if delta.is_empty() { NO_NEW_STEPS.to_string() } else { delta };
                refresh = Some((current.clone(), delta));
                self.state.steps_since_refresh = 0;
            }

            self.state.previous_domain = Some(current.clone());
        }

        let mut updates = Vec::new();
        if let Some((domain, history)) = exit {
            info!(domain = %domain, "Updating domain context on exit");
            let summary = self.history_summary();
            let outcome = self
                .run_update(&domain, &history, task, Some(&summary), None, UpdateOperation::Exit)
                .await;
            updates.push(TriggeredUpdate {
                domain,
                operation: UpdateOperation::Exit,
                outcome,
            });
        }
        if let Some((domain, delta)) = refresh {
            info!(domain = %domain, "Refreshing domain context");
            let summary = self.history_summary();
            let outcome = self
                .run_update(&domain, &delta, task, Some(&summary), None, UpdateOperation::Refresh)
                .await;
            updates.push(TriggeredUpdate {
                domain,
                operation: UpdateOperation::Refresh,
                outcome,
            });
        }

        // Summaries above describe the steps before this one.
        self.remember_step(event);

        let goal = if event.next_goal.trim().is_empty() {
            "Processing..."
        } else {
            event.next_goal.as_str()
        };
        self.notifier.notify(
            Notification::new(NotificationRole::Thinking, format!("Step {}: {}", step_number, goal))
                .with_label(format!("Step {}", step_number))
                .with_color(COLOR_THINKING),
        );

        Ok(updates)
    }

    /// Runs the last update for the tracked domain with the run's verdict and
    /// clears the buffer. Returns `None` when nothing was buffered.
    pub async fn finalize_with_judge(&mut self, verdict: Option<&Verdict>, task: Option<&str>) -> Option<UpdateOutcome> {
        let domain = self.state.previous_domain.clone()?;
        if self.state.buffer.is_empty() {
            debug!(domain = %domain, "Nothing buffered, skipping final update");
            return None;
        }

        let history = self.state.buffer.joined();
        let summary = self.final_url_summary();
        info!(domain = %domain, has_verdict = verdict.is_some(), "Finalizing domain context");

        let req = UpdateRequest {
            domain: &domain,
            prior_context: None,
            visit_history: &history,
            task,
            agent_history_summary: Some(&summary),
            verdict,
        };
        match self.apply_update(req).await {
            Ok(outcome) => {
                self.state.buffer.clear();
                Some(outcome)
            }
            Err(e) => {
                error!(domain = %domain, error = %e, "Final domain context update failed");
                self.errors.report(&e, &domain, UpdateOperation::FinalizeJudge);
                Some(UpdateOutcome::Failed(e.to_string()))
            }
        }
    }

    /// Forgets everything about the current run.
    pub fn reset(&mut self) {
        self.state = TrackerState::new(self.settings.max_visit_history_steps);
    }

    async fn run_update(
        &self,
        domain: &str,
        visit_history: &str,
        task: Option<&str>,
        agent_history_summary: Option<&str>,
        verdict: Option<&Verdict>,
        operation: UpdateOperation,
    ) -> UpdateOutcome {
        let req = UpdateRequest {
            domain,
            prior_context: None,
            visit_history,
            task,
            agent_history_summary,
            verdict,
        };
        match self.apply_update(req).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.errors.report(&e, domain, operation);
                UpdateOutcome::Failed(e.to_string())
            }
        }
    }

    /// get → update → set. `req.prior_context` is filled from the store.
    async fn apply_update(&self, req: UpdateRequest<'_>) -> Result<UpdateOutcome> {
        let existing = self.store.get(req.domain).await?;
        let req = UpdateRequest {
            prior_context: existing.as_deref(),
            ..req
        };
        let result = self.updater.update(&req).await?;
        let result = result.trim();
        if result.is_empty() {
            debug!(domain = %req.domain, "Summarizer returned empty context, keeping the stored one");
            return Ok(UpdateOutcome::Skipped);
        }
        self.store.set(req.domain, result).await?;
        Ok(UpdateOutcome::Saved {
            chars: result.chars().count(),
        })
    }

    /// Notifies when a planned navigation targets another domain that already
    /// has stored context.
    async fn announce_known_targets(&self, event: &StepEvent, current: &str) -> Result<()> {
        let mut announced = HashSet::new();
        for url in event.actions.iter().filter_map(|a| a.navigate_url()) {
            let target = extract_domain(url);
            if target.is_empty() || target == current || !announced.insert(target.clone()) {
                continue;
            }
            let known = self.store.get(&target).await?;
            if known.map_or(false, |c| !c.trim().is_empty()) {
                info!(domain = %target, "Agent is heading to a domain with stored context");
                self.notifier.notify(
                    Notification::new(NotificationRole::Info, format!("Preparing context for {}", target))
                        .with_label("Context")
                        .with_color(COLOR_INFO),
                );
            }
        }
        Ok(())
    }

    fn remember_step(&mut self, event: &StepEvent) {
        if self.state.recent.len() == RECENT_STEPS {
            self.state.recent.pop_front();
        }
        self.state.recent.push_back(RecentStep {
            url: event.url.clone(),
            errors: event
                .results
                .iter()
                .filter_map(|r| r.error_text())
                .map(str::to_string)
                .collect(),
        });
    }

    /// Distinct URLs and errors of the most recent steps.
    fn history_summary(&self) -> String {
        let mut seen = HashSet::new();
        let mut lines = Vec::new();
        for step in &self.state.recent {
            if !step.url.is_empty() && seen.insert(step.url.as_str()) {
                lines.push(format!("URL: {}", clip_within(&step.url, 80)));
            }
            for err in &step.errors {
                lines.push(format!("Error: {}", clip_within(err, 100)));
            }
        }
        lines.truncate(MAX_SUMMARY_LINES);
        lines.join("\n")
    }

    /// Distinct URLs of the most recent steps, for the final update.
    fn final_url_summary(&self) -> String {
        let mut seen = HashSet::new();
        self.state
            .recent
            .iter()
            .filter(|s| !s.url.is_empty() && seen.insert(s.url.as_str()))
            .take(MAX_FINAL_URLS)
            .map(|s| format!("URL: {}", clip_within(&s.url, 80)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
