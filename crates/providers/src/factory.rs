use domainctx_core::config::ProviderConfig;
use domainctx_core::Config;
use std::time::Duration;

use crate::{AnthropicProvider, OpenAIProvider, Provider};

/// Default base URL for OpenAI-compatible providers.
fn default_api_base(provider_name: &str) -> &'static str {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "ollama" => "http://localhost:11434/v1",
        _ => "https://api.openai.com/v1",
    }
}

/// Infers the provider from a model id prefix. `None` when the prefix is not
/// recognized.
pub fn infer_provider_from_model(model: &str) -> Option<&'static str> {
    if model.starts_with("anthropic/") || model.starts_with("claude-") {
        Some("anthropic")
    } else if model.starts_with("ollama/") {
        Some("ollama")
    } else if model.starts_with("openai/")
        || model.starts_with("gpt-")
        || model.starts_with("o1")
        || model.starts_with("o3")
    {
        Some("openai")
    } else if model.starts_with("deepseek") {
        Some("deepseek")
    } else if model.starts_with("groq/") {
        Some("groq")
    } else {
        None
    }
}

/// First provider with a usable API key.
fn fallback_provider_name(config: &Config) -> Option<&str> {
    let priority = ["openai", "anthropic", "openrouter", "deepseek", "groq"];
    for name in priority {
        if let Some(p) = config.providers.get(name) {
            if !p.api_key.is_empty() && p.api_key != "dummy" {
                return Some(name);
            }
        }
    }
    if config.providers.contains_key("ollama") {
        return Some("ollama");
    }
    None
}

/// Creates the summarization provider.
///
/// Resolution order: `agents.defaults.provider`, then the model prefix, then
/// the first provider with an API key. An explicitly named provider must be
/// configured with a key (except ollama).
pub fn create_provider(config: &Config) -> anyhow::Result<Box<dyn Provider>> {
    let defaults = &config.agents.defaults;
    let model = defaults.model.as_str();
    let explicit_provider = defaults.provider.as_deref();

    let effective_provider: &str = if let Some(ep) = explicit_provider {
        ep
    } else if let Some(inferred) = infer_provider_from_model(model) {
        inferred
    } else if let Some(fallback) = fallback_provider_name(config) {
        fallback
    } else {
        return Err(anyhow::anyhow!(
            "No LLM provider configured. Set 'agents.defaults.provider', use a recognized model prefix \
             (e.g. 'gpt-4o-mini', 'claude-...'), or add an API key to the providers section."
        ));
    };

    let provider_cfg = config.providers.get(effective_provider);

    if explicit_provider.is_some() && effective_provider != "ollama" {
        match provider_cfg {
            None => {
                return Err(anyhow::anyhow!(
                    "Provider '{}' is explicitly configured but not found in providers section",
                    effective_provider
                ));
            }
            Some(cfg) if cfg.api_key.is_empty() || cfg.api_key == "dummy" => {
                return Err(anyhow::anyhow!(
                    "Provider '{}' is explicitly configured but has no API key",
                    effective_provider
                ));
            }
            _ => {}
        }
    }

    let empty_cfg = ProviderConfig::default();
    let resolved_cfg = provider_cfg.unwrap_or(&empty_cfg);
    let provider_proxy = resolved_cfg.proxy.as_deref();
    let global_proxy = config.network.proxy.as_deref();
    let no_proxy = &config.network.no_proxy;
    let timeout = Duration::from_secs(defaults.request_timeout_secs);

    let provider: Box<dyn Provider> = match effective_provider {
        "anthropic" => Box::new(AnthropicProvider::new_with_proxy(
            &resolved_cfg.api_key,
            resolved_cfg.api_base.as_deref(),
            model,
            defaults.max_tokens,
            defaults.temperature,
            provider_proxy,
            global_proxy,
            no_proxy,
            timeout,
        )),
        other => {
            let api_base = resolved_cfg
                .api_base
                .as_deref()
                .unwrap_or_else(|| default_api_base(other));
            Box::new(OpenAIProvider::new_with_proxy(
                &resolved_cfg.api_key,
                Some(api_base),
                model,
                defaults.max_tokens,
                defaults.temperature,
                provider_proxy,
                global_proxy,
                no_proxy,
                timeout,
            ))
        }
    };
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_provider_from_model() {
        assert_eq!(infer_provider_from_model("anthropic/claude-3-5-haiku"), Some("anthropic"));
        assert_eq!(infer_provider_from_model("claude-3-5-sonnet"), Some("anthropic"));
        assert_eq!(infer_provider_from_model("ollama/llama3"), Some("ollama"));
        assert_eq!(infer_provider_from_model("gpt-4o-mini"), Some("openai"));
        assert_eq!(infer_provider_from_model("deepseek-chat"), Some("deepseek"));
        assert_eq!(infer_provider_from_model("some-unknown-model"), None);
    }

    #[test]
    fn test_explicit_provider_wins() {
        let mut config = Config::default();
        config.providers.get_mut("openai").unwrap().api_key = "sk-test".to_string();
        config.agents.defaults.model = "anthropic/claude-3-5-haiku".to_string();
        config.agents.defaults.provider = Some("openai".to_string());
        assert!(create_provider(&config).is_ok());
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let mut config = Config::default();
        config.agents.defaults.model = "llama3".to_string();
        config.agents.defaults.provider = Some("ollama".to_string());
        assert!(create_provider(&config).is_ok());
    }

    #[test]
    fn test_nothing_configured_fails() {
        let mut config = Config::default();
        for p in config.providers.values_mut() {
            p.api_key = String::new();
        }
        config.providers.remove("ollama");
        config.agents.defaults.model = "some-unknown-model".to_string();
        assert!(create_provider(&config).is_err());
    }

    #[test]
    fn test_explicit_without_key_fails() {
        let mut config = Config::default();
        config.agents.defaults.provider = Some("anthropic".to_string());
        assert!(create_provider(&config).is_err());
    }
}
