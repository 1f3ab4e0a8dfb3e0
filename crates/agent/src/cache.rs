use domainctx_core::CacheSettings;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::step::Verdict;
use crate::text::truncate_str;

struct CacheEntry {
    value: String,
    created_at: Instant,
}

/// In-memory TTL cache of summarizer outputs keyed by an input fingerprint.
///
/// Lives for the process and is owned by whoever builds the updater.
pub struct SummaryCache {
    enabled: bool,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl SummaryCache {
    pub fn new(enabled: bool, ttl: Duration) -> Self {
        Self {
            enabled,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(settings.enabled, Duration::from_secs(settings.ttl_secs))
    }

    pub fn disabled() -> Self {
        Self::new(false, Duration::ZERO)
    }

    /// Fingerprint of one update request: MD5 over the domain and bounded
    /// prefixes of the other inputs.
    pub fn compute_key(
        domain: &str,
        prior_context: Option<&str>,
        visit_history: &str,
        task: Option<&str>,
        verdict: Option<&Verdict>,
    ) -> String {
        let verdict_json = verdict.map(Verdict::to_sorted_json).unwrap_or_default();
        let raw = [
            domain,
            truncate_str(prior_context.unwrap_or_default().trim(), 200),
            truncate_str(visit_history.trim(), 500),
            truncate_str(task.unwrap_or_default().trim(), 200),
            if verdict.is_some() { "true" } else { "false" },
            truncate_str(&verdict_json, 100),
        ]
        .join("|");
        format!("{:x}", md5::compute(raw.as_bytes()))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let expired = match entries.get(key) {
            None => return None,
            Some(entry) => entry.created_at.elapsed() > self.ttl,
        };
        if expired {
            entries.remove(key);
            debug!(key = %key, "Summary cache entry expired");
            return None;
        }
        entries.get(key).map(|e| e.value.clone())
    }

    pub fn put(&self, key: &str, value: &str) {
        if !self.enabled {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                created_at: Instant::now(),
            },
        );
    }

    /// Entries currently held, expired ones included until looked up.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
