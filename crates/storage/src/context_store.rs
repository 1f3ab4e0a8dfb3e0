use chrono::{SecondsFormat, Utc};
use domainctx_core::{normalize_domain, DomainContextConfig, Error, Paths, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Stored knowledge for one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainContextEntry {
    #[serde(default)]
    pub context: String,
    /// ISO-8601 UTC, second precision.
    #[serde(default)]
    pub updated_at: String,
}

pub type DomainContextMap = BTreeMap<String, DomainContextEntry>;

/// Durable domain → context map kept in a single JSON document.
///
/// Every read-modify-write goes through one store-wide lock, and every write
/// replaces the document through a temporary sibling and a rename, so the file
/// on disk is always a complete document.
pub struct ContextStore {
    path: PathBuf,
    max_context_length: usize,
    lock: Mutex<()>,
}

impl ContextStore {
    pub fn new(path: PathBuf, max_context_length: usize) -> Self {
        Self {
            path,
            max_context_length,
            lock: Mutex::new(()),
        }
    }

    pub fn from_config(paths: &Paths, config: &DomainContextConfig) -> Self {
        Self::new(config.store_path(paths), config.max_context_length)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_context_length(&self) -> usize {
        self.max_context_length
    }

    /// Loads the whole map. A missing document is an empty map. An empty or
    /// unparseable document is reset to `{}` and reported as
    /// [`Error::CorruptStore`]. Malformed entries are skipped.
    pub async fn load(&self) -> Result<DomainContextMap> {
        let _guard = self.lock.lock().await;
        self.load_unlocked().await
    }

    /// Replaces the whole document with `map`.
    pub async fn save(&self, map: &DomainContextMap) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.save_unlocked(map).await
    }

    pub async fn get(&self, domain: &str) -> Result<Option<String>> {
        let key = normalize_domain(domain);
        let _guard = self.lock.lock().await;
        let map = self.load_unlocked().await?;
        Ok(map.get(&key).map(|e| e.context.clone()))
    }

    pub async fn entry(&self, domain: &str) -> Result<Option<DomainContextEntry>> {
        let key = normalize_domain(domain);
        let _guard = self.lock.lock().await;
        let mut map = self.load_unlocked().await?;
        Ok(map.remove(&key))
    }

    /// Upserts the context for `domain`, keeping only the trailing
    /// `max_context_length` characters.
    pub async fn set(&self, domain: &str, context: &str) -> Result<()> {
        let key = normalize_domain(domain);
        if key.is_empty() {
            return Err(Error::Validation("domain must not be empty".to_string()));
        }

        let total = context.chars().count();
        let context = if total > self.max_context_length {
            warn!(
                domain = %key,
                original_chars = total,
                kept_chars = self.max_context_length,
                "Domain context too long, keeping the most recent part"
            );
            tail_chars(context, self.max_context_length)
        } else {
            context
        };

        let _guard = self.lock.lock().await;
        let mut map = self.load_unlocked().await?;
        map.insert(
            key.clone(),
            DomainContextEntry {
                context: context.to_string(),
                updated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, false),
            },
        );
        self.save_unlocked(&map).await?;
        info!(domain = %key, chars = context.chars().count(), "Domain context saved");
        Ok(())
    }

    /// Resets the document to an empty map.
    pub async fn reset(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.save_unlocked(&DomainContextMap::new()).await
    }

    async fn load_unlocked(&self) -> Result<DomainContextMap> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No domain context document yet");
                return Ok(DomainContextMap::new());
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Failed to read domain context document");
                return Err(e.into());
            }
        };

        let reason = if content.trim().is_empty() {
            "document is empty".to_string()
        } else {
            match serde_json::from_str::<Value>(&content) {
                Ok(doc) => return Ok(self.entries_from(doc)),
                Err(e) => e.to_string(),
            }
        };

        error!(
            path = %self.path.display(),
            reason = %reason,
            "Domain context document is invalid, reinitializing"
        );
        if let Err(e) = self.save_unlocked(&DomainContextMap::new()).await {
            error!(path = %self.path.display(), error = %e, "Failed to reinitialize domain context document");
        }
        Err(Error::CorruptStore {
            path: self.path.display().to_string(),
            reason,
        })
    }

    /// Keeps the well-formed entries of a parsed document. A document that is
    /// not an object yields an empty map and is left on disk as it is.
    fn entries_from(&self, doc: Value) -> DomainContextMap {
        let entries = match doc {
            Value::Object(entries) => entries,
            other => {
                warn!(
                    path = %self.path.display(),
                    kind = json_kind(&other),
                    "Domain context document is not an object, ignoring it"
                );
                return DomainContextMap::new();
            }
        };

        let mut map = DomainContextMap::new();
        for (domain, raw) in entries {
            match serde_json::from_value::<DomainContextEntry>(raw) {
                Ok(entry) => {
                    map.insert(domain, entry);
                }
                Err(e) => {
                    warn!(domain = %domain, error = %e, "Skipping malformed domain context entry");
                }
            }
        }
        map
    }

    async fn save_unlocked(&self, map: &DomainContextMap) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_string_pretty(map)?;
        let tmp_path = tmp_sibling(&self.path);

        let write = async {
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            file.write_all(content.as_bytes()).await?;
            file.sync_all().await?;
            Ok::<(), std::io::Error>(())
        };
        if let Err(e) = write.await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            error!(path = %tmp_path.display(), error = %e, "Failed to write domain context document");
            return Err(e.into());
        }

        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            error!(path = %self.path.display(), error = %e, "Atomic rename of domain context document failed");
            return Err(Error::Storage(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            )));
        }
        Ok(())
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `domains_context.json` → `domains_context.json.tmp`
fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// The last `max` characters of `s`, on a char boundary.
fn tail_chars(s: &str, max: usize) -> &str {
    let total = s.chars().count();
    if total <= max {
        return s;
    }
    match s.char_indices().nth(total - max) {
        Some((idx, _)) => &s[idx..],
        None => "",
    }
}
