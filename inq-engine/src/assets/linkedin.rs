//! LinkedIn profile assets

use super::{registrant, related_ref, AssetKind, AssetRecord, AssetRef, Ownership, TransformCache};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use url::Url;

/// Validate a profile URL under `linkedin.com/in/` and normalize it to
/// `scheme://host/in/<username>`
pub fn canonicalize(raw: &str) -> Result<String, ValidationError> {
    let invalid = |reason: &str| ValidationError::new(AssetKind::LinkedIn, raw, reason);

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid("LinkedIn accounts cannot be empty"));
    }

    let url = Url::parse(trimmed).map_err(|e| invalid(&format!("not a URL: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("not an http(s) URL"));
    }

    let host = url.host_str().unwrap_or_default();
    if host != "linkedin.com" && !host.ends_with(".linkedin.com") {
        return Err(invalid("not a linkedin.com URL"));
    }

    let username = url
        .path()
        .strip_prefix("/in/")
        .and_then(|rest| rest.split('/').next())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| invalid("not a /in/ profile path"))?;

    Ok(format!("{}://{}/in/{}", url.scheme(), host, username))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkedIn {
    pub linkedin: String,
    pub username: String,
    /// Registrant the profile is affiliated with, when a source reported one
    pub affiliation: Option<String>,
    pub ownership: Ownership,
    pub transforms: TransformCache,
}

impl LinkedIn {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let linkedin = canonicalize(raw)?;
        let username = linkedin
            .rsplit_once("/in/")
            .map(|(_, name)| name.to_string())
            .unwrap_or_default();

        Ok(Self {
            linkedin,
            username,
            affiliation: None,
            ownership: Ownership::Unknown,
            transforms: TransformCache::new(),
        })
    }

    /// Attach an affiliated organization; invalid names are logged and ignored
    pub fn set_affiliation(&mut self, organization: &str) {
        if let Some(r) = related_ref(AssetKind::Registrant, organization, registrant::canonicalize) {
            self.affiliation = Some(r.key);
        }
    }
}

impl AssetRecord for LinkedIn {
    const KIND: AssetKind = AssetKind::LinkedIn;

    fn key(&self) -> &str {
        &self.linkedin
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
        self.affiliation
            .iter()
            .map(|a| AssetRef::new(AssetKind::Registrant, a.as_str()))
            .collect()
    }
}
