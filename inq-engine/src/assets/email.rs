//! Email address assets
//!
//! Addresses are validated for RFC 5321 shape: a dot-atom local part and a
//! domain that must itself be a valid host. The recipient keeps its case;
//! the domain is canonicalized as a host.

use super::{host, AssetKind, AssetRecord, AssetRef, Ownership, TransformCache};
use crate::error::ValidationError;
use crate::sources::SourceKind;
use serde::{Deserialize, Serialize};

const MAX_EMAIL_LENGTH: usize = 254;
const MAX_LOCAL_PART_LENGTH: usize = 64;

fn is_valid_local_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '.' | '!' | '#' | '$' | '%' | '&' | '\'' | '*' | '+' | '-' | '/' | '=' | '?' | '^'
                | '_' | '`' | '{' | '|' | '}' | '~'
        )
}

fn validate_local_part(local: &str) -> Result<(), &'static str> {
    if local.is_empty() {
        return Err("recipient is empty");
    }
    if local.len() > MAX_LOCAL_PART_LENGTH {
        return Err("recipient is too long");
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return Err("recipient has a misplaced dot");
    }
    if !local.chars().all(is_valid_local_char) {
        return Err("recipient contains an invalid character");
    }
    Ok(())
}

/// Validate `recipient@domain` and canonicalize the domain as a host
pub fn canonicalize(raw: &str) -> Result<String, ValidationError> {
    let invalid = |reason: &str| ValidationError::new(AssetKind::Email, raw, reason);

    let email = raw.trim();
    if email.is_empty() {
        return Err(invalid("emails cannot be empty"));
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(invalid("email is too long"));
    }

    let (recipient, domain) = email
        .split_once('@')
        .ok_or_else(|| invalid("missing '@'"))?;
    if domain.contains('@') {
        return Err(invalid("multiple '@' symbols"));
    }
    validate_local_part(recipient).map_err(invalid)?;
    if !domain.contains('.') {
        return Err(invalid("domain must contain a dot"));
    }

    let domain = host::canonicalize(domain)
        .map_err(|e| invalid(&format!("unable to validate domain: {}", e.reason)))?;

    Ok(format!("{}@{}", recipient, domain))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Email {
    pub email: String,
    pub recipient: String,
    pub domain: String,
    pub ownership: Ownership,
    pub transforms: TransformCache,
}

impl Email {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let email = canonicalize(raw)?;
        let (recipient, domain) = email
            .split_once('@')
            .map(|(r, d)| (r.to_string(), d.to_string()))
            .ok_or_else(|| ValidationError::new(AssetKind::Email, raw, "missing '@'"))?;

        Ok(Self {
            email,
            recipient,
            domain,
            ownership: Ownership::Unknown,
            transforms: TransformCache::new(),
        })
    }
}

impl AssetRecord for Email {
    const KIND: AssetKind = AssetKind::Email;

    fn key(&self) -> &str {
        &self.email
    }

    fn ownership(&self) -> Ownership {
        self.ownership
    }

    fn set_ownership(&mut self, ownership: Ownership) {
        self.ownership = ownership;
    }

    fn transforms(&self) -> &TransformCache {
        &self.transforms
    }

    fn transforms_mut(&mut self) -> &mut TransformCache {
        &mut self.transforms
    }

    fn relations(&self) -> Vec<AssetRef> {
        self.ownership_candidates()
    }

    fn ownership_candidates(&self) -> Vec<AssetRef> {
        vec![AssetRef::new(AssetKind::Host, self.domain.as_str())]
    }

    fn transform_queries(&self, source: SourceKind) -> Vec<String> {
        match source {
            SourceKind::Google => vec![format!("\"{}\"", self.email)],
            SourceKind::Shodan => Vec::new(),
        }
    }
}
