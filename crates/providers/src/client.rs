use reqwest::{Client, Proxy};
use std::time::Duration;
use tracing::{info, warn};

/// Effective proxy decision for one provider endpoint.
#[derive(Debug, PartialEq, Eq)]
enum ProxyChoice {
    Use(String),
    /// The provider set `proxy = ""`: bypass every proxy, including env vars.
    Direct,
    /// Nothing configured; reqwest reads HTTPS_PROXY / HTTP_PROXY itself.
    Inherit,
}

/// Matches a host against `no_proxy` rules: exact hosts, `*.suffix`
/// (subdomains only) and `.suffix` (the suffix and its subdomains).
fn matches_no_proxy(host: &str, rules: &[String]) -> bool {
    let host = host.to_lowercase();
    rules.iter().any(|rule| {
        let rule = rule.trim().to_lowercase();
        if rule.is_empty() {
            false
        } else if let Some(suffix) = rule.strip_prefix("*.") {
            host.ends_with(&format!(".{}", suffix))
        } else if let Some(suffix) = rule.strip_prefix('.') {
            host == suffix || host.ends_with(&format!(".{}", suffix))
        } else {
            host == rule
        }
    })
}

fn choose_proxy(
    provider_proxy: Option<&str>,
    global_proxy: Option<&str>,
    no_proxy: &[String],
    api_base: &str,
) -> ProxyChoice {
    match provider_proxy {
        Some("") => return ProxyChoice::Direct,
        Some(p) => return ProxyChoice::Use(p.to_string()),
        None => {}
    }

    match global_proxy {
        Some(global) if !global.is_empty() => {
            let host = url::Url::parse(api_base)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string));
            if let Some(host) = host {
                if matches_no_proxy(&host, no_proxy) {
                    return ProxyChoice::Direct;
                }
            }
            ProxyChoice::Use(global.to_string())
        }
        _ => ProxyChoice::Inherit,
    }
}

/// Builds the HTTP client used by summarization providers.
///
/// Precedence: the provider's own `proxy`, then `network.proxy` filtered by
/// `network.noProxy`, then the environment.
pub fn build_http_client(
    provider_proxy: Option<&str>,
    global_proxy: Option<&str>,
    no_proxy: &[String],
    api_base: &str,
    timeout: Duration,
) -> Client {
    let mut builder = Client::builder().timeout(timeout);

    match choose_proxy(provider_proxy, global_proxy, no_proxy, api_base) {
        ProxyChoice::Use(proxy_url) => match Proxy::all(&proxy_url) {
            Ok(p) => {
                info!(proxy = %proxy_url, api_base = %api_base, "Summarizer using proxy");
                builder = builder.proxy(p);
            }
            Err(e) => {
                warn!(error = %e, proxy = %proxy_url, "Invalid proxy URL, connecting directly");
            }
        },
        ProxyChoice::Direct => {
            info!(api_base = %api_base, "Summarizer proxy disabled");
            builder = builder.no_proxy();
        }
        ProxyChoice::Inherit => {}
    }

    builder.build().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to build HTTP client, using default");
        Client::new()
    })
}
