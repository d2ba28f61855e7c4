//! Asset model
//!
//! Five asset kinds make up the discovery graph. Each kind has:
//! - a canonicalizer turning raw identifiers into a unique key
//! - a typed record struct (stored as JSON, unknown fields rejected)
//! - relation edges walked by relation closure
//! - ownership-inference candidates
//! - OSINT queries per source
//!
//! `Asset` is the closed union over the five record types; all
//! polymorphic behavior dispatches through it.

pub mod block;
pub mod email;
pub mod host;
pub mod linkedin;
pub mod registrant;
pub mod registry;

pub use block::Block;
pub use email::Email;
pub use host::Host;
pub use linkedin::LinkedIn;
pub use registrant::Registrant;
pub use registry::{AssetRegistry, KindSpec};

use crate::error::{InqResult, InquisitorError, ValidationError};
use crate::lookup::NetworkLookup;
use crate::sources::SourceKind;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Asset kinds, in status/dump order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Registrant,
    Block,
    Host,
    Email,
    LinkedIn,
}

impl AssetKind {
    pub const ALL: [AssetKind; 5] = [
        AssetKind::Registrant,
        AssetKind::Block,
        AssetKind::Host,
        AssetKind::Email,
        AssetKind::LinkedIn,
    ];

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            AssetKind::Registrant => "Registrant",
            AssetKind::Block => "Block",
            AssetKind::Host => "Host",
            AssetKind::Email => "Email",
            AssetKind::LinkedIn => "LinkedIn",
        }
    }

    /// Lowercase name used in CLI flags and serialized references
    pub fn name(&self) -> &'static str {
        match self {
            AssetKind::Registrant => "registrant",
            AssetKind::Block => "block",
            AssetKind::Host => "host",
            AssetKind::Email => "email",
            AssetKind::LinkedIn => "linkedin",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Explicit (manual) classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ownership {
    Accepted,
    #[default]
    Unknown,
    Rejected,
}

impl Ownership {
    /// `Some(owned)` for a manual classification, `None` when inference applies
    pub fn explicit(&self) -> Option<bool> {
        match self {
            Ownership::Accepted => Some(true),
            Ownership::Rejected => Some(false),
            Ownership::Unknown => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Ownership::Accepted => "accepted",
            Ownership::Unknown => "unknown",
            Ownership::Rejected => "rejected",
        }
    }
}

/// Reference to an asset by identity only
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetRef {
    pub kind: AssetKind,
    pub key: String,
}

impl AssetRef {
    pub fn new(kind: AssetKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
        }
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.kind.label(), self.key)
    }
}

/// Source name → assets that source yielded, in discovery order
pub type TransformCache = BTreeMap<String, Vec<AssetRef>>;

/// Behavior shared by the five record types
pub trait AssetRecord: Clone + Serialize + DeserializeOwned {
    const KIND: AssetKind;

    fn key(&self) -> &str;
    fn ownership(&self) -> Ownership;
    fn set_ownership(&mut self, ownership: Ownership);
    fn transforms(&self) -> &TransformCache;
    fn transforms_mut(&mut self) -> &mut TransformCache;

    /// Directly related assets, persisted by relation closure
    fn relations(&self) -> Vec<AssetRef> {
        Vec::new()
    }

    /// Related assets whose ownership implies this one's, in priority order
    fn ownership_candidates(&self) -> Vec<AssetRef> {
        Vec::new()
    }

    /// Queries issued to `source` when transforming this asset
    fn transform_queries(&self, _source: SourceKind) -> Vec<String> {
        Vec::new()
    }
}

/// Canonicalize an optional related key, logging and dropping invalid values
pub(crate) fn related_ref(
    kind: AssetKind,
    raw: &str,
    canonicalize: fn(&str) -> Result<String, ValidationError>,
) -> Option<AssetRef> {
    match canonicalize(raw) {
        Ok(key) => Some(AssetRef::new(kind, key)),
        Err(e) => {
            tracing::warn!(kind = %kind, input = raw, error = %e, "Skipping invalid related identifier");
            None
        }
    }
}

/// Any asset
#[derive(Debug, Clone)]
pub enum Asset {
    Registrant(Registrant),
    Block(Block),
    Host(Host),
    Email(Email),
    LinkedIn(LinkedIn),
}

macro_rules! dispatch {
    ($self:expr, $a:ident => $body:expr) => {
        match $self {
            Asset::Registrant($a) => $body,
            Asset::Block($a) => $body,
            Asset::Host($a) => $body,
            Asset::Email($a) => $body,
            Asset::LinkedIn($a) => $body,
        }
    };
}

impl Asset {
    pub fn kind(&self) -> AssetKind {
        match self {
            Asset::Registrant(_) => AssetKind::Registrant,
            Asset::Block(_) => AssetKind::Block,
            Asset::Host(_) => AssetKind::Host,
            Asset::Email(_) => AssetKind::Email,
            Asset::LinkedIn(_) => AssetKind::LinkedIn,
        }
    }

    pub fn key(&self) -> &str {
        dispatch!(self, a => a.key())
    }

    pub fn reference(&self) -> AssetRef {
        AssetRef::new(self.kind(), self.key())
    }

    pub fn ownership(&self) -> Ownership {
        dispatch!(self, a => a.ownership())
    }

    pub fn set_ownership(&mut self, ownership: Ownership) {
        dispatch!(self, a => a.set_ownership(ownership))
    }

    pub fn transforms(&self) -> &TransformCache {
        dispatch!(self, a => a.transforms())
    }

    /// Cached discoveries for `source`; `Some(&[])` means "queried, found nothing"
    pub fn cached_transform(&self, source: SourceKind) -> Option<&[AssetRef]> {
        self.transforms().get(source.as_str()).map(Vec::as_slice)
    }

    /// Record what `source` yielded, replacing any previous entry
    pub fn cache_transform(&mut self, source: SourceKind, discovered: &[AssetRef]) {
        let mut entry: Vec<AssetRef> = Vec::with_capacity(discovered.len());
        for r in discovered {
            if !entry.contains(r) {
                entry.push(r.clone());
            }
        }
        dispatch!(self, a => a.transforms_mut().insert(source.as_str().to_string(), entry));
    }

    pub fn relations(&self) -> Vec<AssetRef> {
        dispatch!(self, a => a.relations())
    }

    pub fn ownership_candidates(&self) -> Vec<AssetRef> {
        dispatch!(self, a => a.ownership_candidates())
    }

    pub fn transform_queries(&self, source: SourceKind) -> Vec<String> {
        dispatch!(self, a => a.transform_queries(source))
    }

    /// Stored JSON form
    pub fn to_data(&self) -> InqResult<serde_json::Value> {
        Ok(dispatch!(self, a => serde_json::to_value(a))?)
    }

    /// Rebuild a typed asset from its stored JSON form
    ///
    /// Unknown or missing fields are rejected rather than silently filled.
    pub fn from_data(kind: AssetKind, data: &serde_json::Value) -> InqResult<Asset> {
        fn parse<T: AssetRecord>(data: &serde_json::Value) -> InqResult<T> {
            let record: T = T::deserialize(data).map_err(|e| InquisitorError::CorruptRecord {
                kind: T::KIND,
                key: key_hint(data, T::KIND),
                reason: e.to_string(),
            })?;
            Ok(record)
        }

        Ok(match kind {
            AssetKind::Registrant => Asset::Registrant(parse(data)?),
            AssetKind::Block => Asset::Block(parse(data)?),
            AssetKind::Host => Asset::Host(parse(data)?),
            AssetKind::Email => Asset::Email(parse(data)?),
            AssetKind::LinkedIn => Asset::LinkedIn(parse(data)?),
        })
    }

    /// Construct a fresh, unclassified asset, running its derivations
    ///
    /// `raw` is canonicalized first. Host and Block derivations perform
    /// network lookups; lookup failures leave the derived fields empty.
    pub async fn create(
        kind: AssetKind,
        raw: &str,
        lookup: &dyn NetworkLookup,
    ) -> Result<Asset, ValidationError> {
        Ok(match kind {
            AssetKind::Registrant => Asset::Registrant(Registrant::new(raw)?),
            AssetKind::Block => Asset::Block(Block::create(raw, lookup).await?),
            AssetKind::Host => Asset::Host(Host::create(raw, lookup).await?),
            AssetKind::Email => Asset::Email(Email::new(raw)?),
            AssetKind::LinkedIn => Asset::LinkedIn(LinkedIn::new(raw)?),
        })
    }

    pub fn as_host(&self) -> Option<&Host> {
        match self {
            Asset::Host(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Asset::Block(b) => Some(b),
            _ => None,
        }
    }
}

/// Best-effort identity for error messages about unreadable records
fn key_hint(data: &serde_json::Value, kind: AssetKind) -> String {
    data.get(kind.name())
        .and_then(|v| v.as_str())
        .unwrap_or("<unknown>")
        .to_string()
}

impl PartialEq for Asset {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.key() == other.key()
    }
}

impl Eq for Asset {}

impl std::hash::Hash for Asset {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        self.key().hash(state);
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.kind().label(), self.key())
    }
}

impl From<Registrant> for Asset {
    fn from(a: Registrant) -> Self {
        Asset::Registrant(a)
    }
}

impl From<Block> for Asset {
    fn from(a: Block) -> Self {
        Asset::Block(a)
    }
}

impl From<Host> for Asset {
    fn from(a: Host) -> Self {
        Asset::Host(a)
    }
}

impl From<Email> for Asset {
    fn from(a: Email) -> Self {
        Asset::Email(a)
    }
}

impl From<LinkedIn> for Asset {
    fn from(a: LinkedIn) -> Self {
        Asset::LinkedIn(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_order_and_names() {
        let names: Vec<_> = AssetKind::ALL.iter().map(|k| k.name()).collect();
        assert_eq!(names, vec!["registrant", "block", "host", "email", "linkedin"]);
        assert_eq!(AssetKind::LinkedIn.to_string(), "LinkedIn");
        assert_eq!(serde_json::to_value(AssetKind::LinkedIn).unwrap(), "linkedin");
    }

    #[test]
    fn test_ownership_explicit() {
        assert_eq!(Ownership::Accepted.explicit(), Some(true));
        assert_eq!(Ownership::Rejected.explicit(), Some(false));
        assert_eq!(Ownership::Unknown.explicit(), None);
        assert_eq!(Ownership::default(), Ownership::Unknown);
    }

    #[test]
    fn test_cache_transform_dedups_in_order() {
        let mut asset = Asset::from(Registrant::new("Acme").unwrap());
        let a = AssetRef::new(AssetKind::Host, "a.example.com");
        let b = AssetRef::new(AssetKind::Host, "b.example.com");
        asset.cache_transform(SourceKind::Google, &[b.clone(), a.clone(), b.clone()]);
        assert_eq!(asset.cached_transform(SourceKind::Google).unwrap(), &[b, a]);
        assert!(asset.cached_transform(SourceKind::Shodan).is_none());
    }

    #[test]
    fn test_empty_cache_entry_is_present() {
        let mut asset = Asset::from(Registrant::new("Acme").unwrap());
        asset.cache_transform(SourceKind::Shodan, &[]);
        assert_eq!(asset.cached_transform(SourceKind::Shodan), Some(&[][..]));
    }

    #[test]
    fn test_data_roundtrip_preserves_cache() {
        let mut asset = Asset::from(Registrant::new("Acme").unwrap());
        asset.set_ownership(Ownership::Accepted);
        asset.cache_transform(SourceKind::Google, &[AssetRef::new(AssetKind::Host, "acme.com")]);
        let data = asset.to_data().unwrap();
        let back = Asset::from_data(AssetKind::Registrant, &data).unwrap();
        assert_eq!(back, asset);
        assert_eq!(back.ownership(), Ownership::Accepted);
        assert_eq!(back.transforms(), asset.transforms());
    }

    #[test]
    fn test_from_data_rejects_unknown_fields() {
        let data = serde_json::json!({
            "registrant": "ACME",
            "ownership": "unknown",
            "transforms": {},
            "owned": true
        });
        let err = Asset::from_data(AssetKind::Registrant, &data).unwrap_err();
        assert!(matches!(err, InquisitorError::CorruptRecord { ref key, .. } if key == "ACME"));
    }

    #[test]
    fn test_from_data_rejects_missing_fields() {
        let data = serde_json::json!({ "registrant": "ACME" });
        assert!(Asset::from_data(AssetKind::Registrant, &data).is_err());
    }

    #[test]
    fn test_equality_by_identity() {
        let mut a = Asset::from(Registrant::new("acme").unwrap());
        let b = Asset::from(Registrant::new("ACME").unwrap());
        a.set_ownership(Ownership::Rejected);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "Registrant : ACME");
    }
}
