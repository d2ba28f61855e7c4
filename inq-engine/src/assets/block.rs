//! Network block assets

use super::{registrant, related_ref, AssetKind, AssetRecord, AssetRef, Ownership, TransformCache};
use crate::error::ValidationError;
use crate::lookup::{self, NetworkLookup};
use crate::sources::SourceKind;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Parse a CIDR (or bare address) and return its network-address form
///
/// Host bits are truncated: `10.0.0.5/24` becomes `10.0.0.0/24`. A bare
/// address becomes a /32 (IPv4) or /128 (IPv6).
pub fn canonicalize(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(AssetKind::Block, raw, "blocks cannot be empty"));
    }

    let network = match trimmed.parse::<IpNet>() {
        Ok(net) => net,
        Err(_) => trimmed
            .parse::<IpAddr>()
            .map(IpNet::from)
            .map_err(|_| ValidationError::new(AssetKind::Block, raw, "unable to parse block"))?,
    };

    Ok(network.trunc().to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Block {
    pub block: String,
    /// Registrant from RDAP, set only when the registry's network is exactly this block
    pub registrant: Option<String>,
    pub ownership: Ownership,
    pub transforms: TransformCache,
}

impl Block {
    /// Canonicalize `raw` without running derivations
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            block: canonicalize(raw)?,
            registrant: None,
            ownership: Ownership::Unknown,
            transforms: TransformCache::new(),
        })
    }

    /// Canonicalize `raw` and derive the registrant from RDAP
    pub async fn create(raw: &str, lookup: &dyn NetworkLookup) -> Result<Self, ValidationError> {
        let mut asset = Self::new(raw)?;
        let Some(network) = asset.network() else {
            return Ok(asset);
        };

        let record = match lookup::with_retries("network registration", || {
            lookup.network_registration(network.network())
        })
        .await
        {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!(block = %asset.block, error = %e, "Network registration unavailable");
                return Ok(asset);
            }
        };

        let exact = record
            .cidrs
            .iter()
            .any(|cidr| canonicalize(cidr).is_ok_and(|c| c == asset.block));
        if exact {
            asset.registrant = record
                .registrant
                .as_deref()
                .and_then(|name| related_ref(AssetKind::Registrant, name, registrant::canonicalize))
                .map(|r| r.key);
        }

        Ok(asset)
    }

    /// Parsed network; `None` only for a corrupt stored key
    pub fn network(&self) -> Option<IpNet> {
        self.block.parse().ok()
    }
}

impl AssetRecord for Block {
    const KIND: AssetKind = AssetKind::Block;

    fn key(&self) -> &str {
        &self.block
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
        self.registrant
            .iter()
            .map(|r| AssetRef::new(AssetKind::Registrant, r.as_str()))
            .collect()
    }

    fn transform_queries(&self, source: SourceKind) -> Vec<String> {
        match source {
            SourceKind::Shodan => vec![format!("net:\"{}\"", self.block)],
            SourceKind::Google => Vec::new(),
        }
    }
}
