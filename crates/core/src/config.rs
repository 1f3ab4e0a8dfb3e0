use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{Error, Result};
use crate::paths::Paths;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_base: Option<String>,
    /// Per-provider proxy. `Some("")` forces a direct connection.
    #[serde(default)]
    pub proxy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default)]
    pub no_proxy: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDefaults {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Explicit provider name. When unset it is inferred from the model prefix.
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_temperature() -> f32 {
    0.3
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            provider: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AgentsConfig {
    #[serde(default)]
    pub defaults: AgentDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSettings {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainContextConfig {
    /// Steps a domain must accumulate before leaving it triggers an update.
    #[serde(default = "default_min_steps_for_update")]
    pub min_steps_for_update: u32,
    /// Steps inside one domain between periodic refresh updates.
    #[serde(default = "default_refresh_steps")]
    pub refresh_steps: u32,
    #[serde(default = "default_max_visit_history_steps")]
    pub max_visit_history_steps: usize,
    /// Characters kept per stored context (the tail survives truncation).
    #[serde(default = "default_max_context_length")]
    pub max_context_length: usize,
    #[serde(default)]
    pub cache: CacheSettings,
    /// Overrides the default `logs/domains_context.json` location.
    #[serde(default)]
    pub store_path: Option<String>,
    /// Overrides the built-in update prompt.
    #[serde(default)]
    pub prompt_template: Option<String>,
    /// Log expected browser/CDP errors without their full detail.
    #[serde(default)]
    pub suppress_expected_errors: bool,
    /// Promote per-step traces from debug to info.
    #[serde(default)]
    pub trace_steps: bool,
}

fn default_min_steps_for_update() -> u32 {
    3
}

fn default_refresh_steps() -> u32 {
    10
}

fn default_max_visit_history_steps() -> usize {
    20
}

fn default_max_context_length() -> usize {
    2000
}

impl Default for DomainContextConfig {
    fn default() -> Self {
        Self {
            min_steps_for_update: default_min_steps_for_update(),
            refresh_steps: default_refresh_steps(),
            max_visit_history_steps: default_max_visit_history_steps(),
            max_context_length: default_max_context_length(),
            cache: CacheSettings::default(),
            store_path: None,
            prompt_template: None,
            suppress_expected_errors: false,
            trace_steps: false,
        }
    }
}

impl DomainContextConfig {
    /// Applies overrides from the environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary lookup. Unparseable values are
    /// ignored with a warning.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, "DOMAIN_CONTEXT_MIN_STEPS_FOR_UPDATE") {
            self.min_steps_for_update = v;
        }
        if let Some(v) = parse_var(&lookup, "DOMAIN_CONTEXT_REFRESH_STEPS") {
            self.refresh_steps = v;
        }
        if let Some(v) = parse_var(&lookup, "MAX_VISIT_HISTORY_STEPS") {
            self.max_visit_history_steps = v;
        }
        if let Some(v) = parse_var(&lookup, "DOMAIN_CONTEXT_MAX_LENGTH") {
            self.max_context_length = v;
        }
        if let Some(v) = parse_var(&lookup, "DOMAIN_CONTEXT_CACHE_TTL_S") {
            self.cache.ttl_secs = v;
        }
        if let Some(v) = lookup("DOMAIN_CONTEXT_CACHE_ENABLED") {
            self.cache.enabled = parse_flag(&v);
        }
        if let Some(v) = lookup("SUPPRESS_EXPECTED_CDP_ERRORS") {
            self.suppress_expected_errors = parse_flag(&v);
        }
        if let Some(v) = lookup("TRACE_AGENT") {
            self.trace_steps = parse_flag(&v);
        }
    }

    pub fn store_path(&self, paths: &Paths) -> PathBuf {
        match self.store_path.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => PathBuf::from(p),
            _ => paths.domains_context_file(),
        }
    }

    pub fn prompt_template_path(&self, paths: &Paths) -> PathBuf {
        match self.prompt_template.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => PathBuf::from(p),
            _ => paths.domain_context_prompt(),
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key = %key, value = %raw, "Ignoring invalid environment override");
            None
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub domain_context: DomainContextConfig,
}

impl Default for Config {
    fn default() -> Self {
        let mut providers = HashMap::new();
        providers.insert("openrouter".to_string(), ProviderConfig {
            api_key: String::new(),
            api_base: Some("https://openrouter.ai/api/v1".to_string()),
            proxy: None,
        });
        providers.insert("anthropic".to_string(), ProviderConfig::default());
        providers.insert("openai".to_string(), ProviderConfig::default());
        providers.insert("deepseek".to_string(), ProviderConfig::default());
        providers.insert("ollama".to_string(), ProviderConfig {
            api_key: "ollama".to_string(),
            api_base: Some("http://localhost:11434/v1".to_string()),
            proxy: None,
        });

        Self {
            providers,
            agents: AgentsConfig::default(),
            network: NetworkConfig::default(),
            domain_context: DomainContextConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn load_or_default(paths: &Paths) -> Result<Self> {
        let config_path = paths.config_file();
        let mut config = if config_path.exists() {
            Self::load(&config_path)?
        } else {
            Self::default()
        };
        config.domain_context.apply_env_overrides();
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_context_defaults() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        let dc = &cfg.domain_context;
        assert_eq!(dc.min_steps_for_update, 3);
        assert_eq!(dc.refresh_steps, 10);
        assert_eq!(dc.max_visit_history_steps, 20);
        assert_eq!(dc.max_context_length, 2000);
        assert!(dc.cache.enabled);
        assert_eq!(dc.cache.ttl_secs, 3600);
    }

    #[test]
    fn test_domain_context_camel_case() {
        let raw = r#"{
  "domainContext": {
    "minStepsForUpdate": 5,
    "refreshSteps": 4,
    "cache": { "enabled": false, "ttlSecs": 60 },
    "storePath": "/var/lib/ctx.json"
  },
  "providers": {}
}"#;
        let cfg: Config = serde_json::from_str(raw).unwrap();
        let dc = &cfg.domain_context;
        assert_eq!(dc.min_steps_for_update, 5);
        assert_eq!(dc.refresh_steps, 4);
        assert_eq!(dc.max_visit_history_steps, 20);
        assert!(!dc.cache.enabled);
        assert_eq!(dc.cache.ttl_secs, 60);
        let paths = Paths::with_base(PathBuf::from("/tmp/x"));
        assert_eq!(dc.store_path(&paths), PathBuf::from("/var/lib/ctx.json"));
    }

    #[test]
    fn test_load_reports_bad_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"domainContext": {"refreshSteps": "ten"}}"#).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("config.json")));
    }

    #[test]
    fn test_env_overrides() {
        let mut dc = DomainContextConfig::default();
        let env: HashMap<&str, &str> = [
            ("DOMAIN_CONTEXT_REFRESH_STEPS", "7"),
            ("DOMAIN_CONTEXT_CACHE_ENABLED", "no"),
            ("DOMAIN_CONTEXT_MAX_LENGTH", "not-a-number"),
            ("TRACE_AGENT", "1"),
        ]
        .into_iter()
        .collect();
        dc.apply_overrides_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(dc.refresh_steps, 7);
        assert!(!dc.cache.enabled);
        assert_eq!(dc.max_context_length, 2000);
        assert!(dc.trace_steps);
    }
}
