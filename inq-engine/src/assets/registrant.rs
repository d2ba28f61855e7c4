//! Registrant (organization) assets

use super::{AssetKind, AssetRecord, Ownership, TransformCache};
use crate::error::ValidationError;
use crate::sources::SourceKind;
use serde::{Deserialize, Serialize};

/// Fold accents to ASCII, trim and uppercase so that spelling variants of one
/// organization share a key
pub fn canonicalize(raw: &str) -> Result<String, ValidationError> {
    let folded = deunicode::deunicode(raw.trim());
    let key = folded.trim().to_uppercase();
    if key.is_empty() {
        return Err(ValidationError::new(
            AssetKind::Registrant,
            raw,
            "registrants cannot be empty",
        ));
    }
    Ok(key)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Registrant {
    pub registrant: String,
    pub ownership: Ownership,
    pub transforms: TransformCache,
}

impl Registrant {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            registrant: canonicalize(raw)?,
            ownership: Ownership::Unknown,
            transforms: TransformCache::new(),
        })
    }
}

impl AssetRecord for Registrant {
    const KIND: AssetKind = AssetKind::Registrant;

    fn key(&self) -> &str {
        &self.registrant
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

    fn transform_queries(&self, source: SourceKind) -> Vec<String> {
        match source {
            SourceKind::Google => vec![
                self.registrant.clone(),
                format!("site:linkedin.com {}", self.registrant),
            ],
            SourceKind::Shodan => vec![
                self.registrant.clone(),
                format!("org:\"{}\"", self.registrant),
            ],
        }
    }
}
