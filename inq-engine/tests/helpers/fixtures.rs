//! Canned network data and asset builders

use inq_engine::assets::{Asset, Ownership};
use inq_engine::lookup::{DomainRecord, NetworkRecord, StaticLookup};
use std::net::IpAddr;

/// Lookup data for a small organization:
/// - www.acme.com resolves to 203.0.113.10
/// - acme.com is registered to "Acme Corp" with a hostmaster address
/// - 203.0.113.0/24 is registered to "Acme Corp"
pub fn acme_lookup() -> StaticLookup {
    let ip: IpAddr = "203.0.113.10".parse().unwrap();
    let network = NetworkRecord {
        cidrs: vec!["203.0.113.0/24".to_string()],
        registrant: Some("Acme Corp".to_string()),
    };

    StaticLookup::new()
        .with_host("www.acme.com", ip)
        .with_domain(
            "acme.com",
            DomainRecord {
                organization: Some("Acme Corp".to_string()),
                emails: vec!["hostmaster@acme.com".to_string()],
                nameservers: vec![],
            },
        )
        .with_network(ip, network.clone())
        .with_network("203.0.113.0".parse().unwrap(), network)
}

/// `asset` with its ownership set
pub fn classified(asset: impl Into<Asset>, ownership: Ownership) -> Asset {
    let mut asset = asset.into();
    asset.set_ownership(ownership);
    asset
}

/// Display names ("Kind : key") of `assets`, in order
pub fn names(assets: &[Asset]) -> Vec<String> {
    assets.iter().map(|a| a.to_string()).collect()
}
