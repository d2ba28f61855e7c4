//! Identifier extraction from free text

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use url::Url;

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\s@<>]+@[^\s@<>]+\.[^\s@<>]+").expect("Invalid email pattern"));

/// Email-shaped tokens in `text`, unique and sorted
pub fn emails(text: &str) -> Vec<String> {
    EMAIL_REGEX
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Host part of a URL
pub fn link_host(link: &str) -> Option<String> {
    Url::parse(link)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}
