//! Canonical domain keys.
//!
//! A domain key is the lowercase host of a URL without a leading `www.`.
//! It is the only key used by the context store.

use url::Url;

/// Extracts the canonical domain from a URL.
///
/// Returns an empty string for blank input, unparseable URLs, URLs without a
/// host and `about:` pages. Never fails.
pub fn extract_domain(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() || url.to_ascii_lowercase().starts_with("about:") {
        return String::new();
    }
    match Url::parse(url) {
        Ok(parsed) => parsed.host_str().map(normalize_domain).unwrap_or_default(),
        Err(_) => String::new(),
    }
}

/// Normalizes a host string that is already known to be a host.
pub fn normalize_domain(raw: &str) -> String {
    let host = raw.trim().to_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    }
}
