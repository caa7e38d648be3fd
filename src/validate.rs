// src/validate.rs
//! Structural URL validation for destination links. Pure pattern matching,
//! no DNS or network access.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_HTTP_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)^https?://",
        r"(?:(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,6}\.?",
        r"|localhost",
        r"|\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})",
        r"(?::\d+)?",
        r"(?:/?|[/?]\S+)$",
    ))
    .expect("url regex")
});

/// True if `url` is an absolute `http`/`https` URL with a domain,
/// `localhost` or IPv4 host, optional port and optional path/query.
pub fn is_valid_url(url: &str) -> bool {
    RE_HTTP_URL.is_match(url)
}

/// True if there is no expected domain, or the URL mentions it.
pub fn matches_expected_domain(url: &str, expected_domain: &str) -> bool {
    let hint = expected_domain.trim();
    hint.is_empty() || url.contains(hint)
}
