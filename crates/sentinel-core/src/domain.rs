//! URL and hostname normalization shared by the single and bulk entry points.

use std::collections::HashSet;

use reqwest::Url;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("URL is required")]
    Empty,

    #[error("invalid URL \"{input}\": {reason}")]
    Invalid { input: String, reason: String },
}

/// Turns user input into the absolute URL that will be fetched.
///
/// Bare domains (`example.com/pricing`) get an `https://` prefix; inputs that
/// already carry an `http://` or `https://` scheme are kept as-is.
///
/// # Errors
///
/// Returns [`DomainError::Empty`] for blank input and [`DomainError::Invalid`]
/// when the result does not parse as an http(s) URL with a host.
pub fn target_url(input: &str) -> Result<Url, DomainError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Empty);
    }

    let lower = trimmed.to_ascii_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_owned()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&candidate).map_err(|e| DomainError::Invalid {
        input: trimmed.to_owned(),
        reason: e.to_string(),
    })?;

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(DomainError::Invalid {
            input: trimmed.to_owned(),
            reason: "missing host".to_owned(),
        }),
    }
}

/// Returns the cache/identity key for a URL or domain: the lowercase hostname
/// with any leading `www.` removed.
///
/// # Errors
///
/// Propagates [`target_url`] failures.
pub fn normalize_domain(input: &str) -> Result<String, DomainError> {
    let url = target_url(input)?;
    let host = url
        .host_str()
        .unwrap_or_default()
        .trim_end_matches('.')
        .to_ascii_lowercase();
    Ok(host
        .strip_prefix("www.")
        .map_or_else(|| host.clone(), str::to_owned))
}

/// Extracts candidate domains from pasted text or an uploaded `.txt`/`.csv`
/// file. Tokens are split on newlines, commas and whitespace; only tokens with
/// a dot survive. Duplicates keep their first position.
#[must_use]
pub fn parse_domain_list(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    content
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .map(|token| token.trim().trim_matches(|c| c == '"' || c == '\''))
        .filter(|token| !token.is_empty() && token.contains('.'))
        .filter(|token| seen.insert(token.to_ascii_lowercase()))
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
#[path = "domain_test.rs"]
mod tests;
