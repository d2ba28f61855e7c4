//! Host (FQDN) assets

use super::{
    block, email, registrant, related_ref, AssetKind, AssetRecord, AssetRef, Ownership,
    TransformCache,
};
use crate::error::ValidationError;
use crate::lookup::{self, NetworkLookup};
use crate::sources::SourceKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::IpAddr;
use url::Url;

/// Lowercase and trim a host name; it must end in a known public suffix
pub fn canonicalize(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim().trim_end_matches('.').to_lowercase();
    if trimmed.is_empty() {
        return Err(ValidationError::new(AssetKind::Host, raw, "hosts cannot be empty"));
    }
    if trimmed.contains(['/', '\\', '?', '#', '@', ':']) {
        return Err(ValidationError::new(AssetKind::Host, raw, "not a host name"));
    }

    // Parsing as a URL authority normalizes IDNs and rejects forbidden characters
    let host = Url::parse(&format!("http://{}/", trimmed))
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .filter(|h| !h.is_empty() && !h.contains(':'))
        .ok_or_else(|| ValidationError::new(AssetKind::Host, raw, "not a host name"))?;

    match psl::suffix(host.as_bytes()) {
        Some(suffix) if suffix.is_known() => Ok(host),
        _ => Err(ValidationError::new(
            AssetKind::Host,
            raw,
            format!("invalid public suffix for host {}", host),
        )),
    }
}

/// Registrable domain (public suffix plus one label), or the host itself
pub fn registrable_domain(host: &str) -> &str {
    psl::domain_str(host).unwrap_or(host)
}

fn label_count(host: &str) -> usize {
    host.split('.').count()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Host {
    pub host: String,
    /// Host minus its leftmost label
    pub parent: Option<String>,
    pub ip: Option<IpAddr>,
    pub registrant: Option<String>,
    pub emails: Vec<String>,
    pub nameservers: Vec<String>,
    pub blocks: Vec<String>,
    pub ownership: Ownership,
    pub transforms: TransformCache,
}

impl Host {
    /// Canonicalize `raw` and compute the parent domain, without lookups
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let host = canonicalize(raw)?;
        let parent = host
            .split_once('.')
            .and_then(|(_, rest)| canonicalize(rest).ok());

        Ok(Self {
            host,
            parent,
            ip: None,
            registrant: None,
            emails: Vec::new(),
            nameservers: Vec::new(),
            blocks: Vec::new(),
            ownership: Ownership::Unknown,
            transforms: TransformCache::new(),
        })
    }

    /// Canonicalize `raw` and derive address, registration and block data
    ///
    /// Registration data is only fetched for hosts that resolve.
    pub async fn create(raw: &str, lookup: &dyn NetworkLookup) -> Result<Self, ValidationError> {
        let mut asset = Self::new(raw)?;

        asset.ip = match lookup::with_retries("host resolution", || lookup.resolve_host(&asset.host)).await {
            Ok(ip) => ip,
            Err(e) => {
                tracing::debug!(host = %asset.host, error = %e, "Host did not resolve");
                None
            }
        };
        let Some(ip) = asset.ip else {
            return Ok(asset);
        };

        let domain = registrable_domain(&asset.host).to_string();
        match lookup::with_retries("domain registration", || lookup.domain_registration(&domain)).await {
            Ok(record) => {
                asset.registrant = record
                    .organization
                    .as_deref()
                    .and_then(|org| related_ref(AssetKind::Registrant, org, registrant::canonicalize))
                    .map(|r| r.key);
                asset.emails = canonical_set(AssetKind::Email, &record.emails, email::canonicalize);
                asset.nameservers = canonical_set(AssetKind::Host, &record.nameservers, canonicalize);
            }
            Err(e) => {
                tracing::debug!(host = %asset.host, domain = %domain, error = %e, "Domain registration unavailable");
            }
        }

        match lookup::with_retries("network registration", || lookup.network_registration(ip)).await {
            Ok(record) => {
                asset.blocks = canonical_set(AssetKind::Block, &record.cidrs, block::canonicalize);
            }
            Err(e) => {
                tracing::debug!(host = %asset.host, ip = %ip, error = %e, "Network registration unavailable");
            }
        }

        Ok(asset)
    }
}

/// Canonicalize each raw value, dropping invalid ones, sorted and unique
fn canonical_set(
    kind: AssetKind,
    raw: &[String],
    canonicalize: fn(&str) -> Result<String, ValidationError>,
) -> Vec<String> {
    raw.iter()
        .filter_map(|r| related_ref(kind, r, canonicalize))
        .map(|r| r.key)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

impl AssetRecord for Host {
    const KIND: AssetKind = AssetKind::Host;

    fn key(&self) -> &str {
        &self.host
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
        let mut refs = Vec::new();
        // Bare public suffixes are never persisted
        if let Some(parent) = self.parent.as_ref().filter(|p| label_count(p) > 1) {
            refs.push(AssetRef::new(AssetKind::Host, parent.as_str()));
        }
        if let Some(registrant) = &self.registrant {
            refs.push(AssetRef::new(AssetKind::Registrant, registrant.as_str()));
        }
        refs.extend(self.emails.iter().map(|e| AssetRef::new(AssetKind::Email, e.as_str())));
        refs.extend(self.nameservers.iter().map(|n| AssetRef::new(AssetKind::Host, n.as_str())));
        refs.extend(self.blocks.iter().map(|b| AssetRef::new(AssetKind::Block, b.as_str())));
        refs
    }

    fn ownership_candidates(&self) -> Vec<AssetRef> {
        let mut refs = Vec::new();
        if let Some(parent) = &self.parent {
            refs.push(AssetRef::new(AssetKind::Host, parent.as_str()));
        }
        if let Some(registrant) = &self.registrant {
            refs.push(AssetRef::new(AssetKind::Registrant, registrant.as_str()));
        }
        refs
    }

    fn transform_queries(&self, source: SourceKind) -> Vec<String> {
        match source {
            SourceKind::Google => vec![format!("site:{}", self.host), format!("\"@{}\"", self.host)],
            SourceKind::Shodan => vec![self.host.clone(), format!("hostname:\"{}\"", self.host)],
        }
    }
}
