//! In-memory lookups
//!
//! `StaticLookup` answers from fixed tables and counts calls; tests use it in
//! place of DNS/RDAP. `OfflineLookup` knows nothing and is used with
//! `--offline` to seed a database without network access.

use super::{DomainRecord, NetworkLookup, NetworkRecord};
use crate::error::{LookupError, LookupResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct StaticLookup {
    hosts: HashMap<String, IpAddr>,
    domains: HashMap<String, DomainRecord>,
    networks: HashMap<IpAddr, NetworkRecord>,
    calls: AtomicUsize,
}

impl StaticLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, host: &str, ip: IpAddr) -> Self {
        self.hosts.insert(host.to_string(), ip);
        self
    }

    pub fn with_domain(mut self, domain: &str, record: DomainRecord) -> Self {
        self.domains.insert(domain.to_string(), record);
        self
    }

    /// Register the network record returned for `ip`
    pub fn with_network(mut self, ip: IpAddr, record: NetworkRecord) -> Self {
        self.networks.insert(ip, record);
        self
    }

    /// Total lookups answered so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn count(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl NetworkLookup for StaticLookup {
    async fn resolve_host(&self, host: &str) -> LookupResult<Option<IpAddr>> {
        self.count();
        Ok(self.hosts.get(host).copied())
    }

    async fn domain_registration(&self, domain: &str) -> LookupResult<DomainRecord> {
        self.count();
        self.domains
            .get(domain)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(domain.to_string()))
    }

    async fn network_registration(&self, ip: IpAddr) -> LookupResult<NetworkRecord> {
        self.count();
        self.networks
            .get(&ip)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(ip.to_string()))
    }
}

/// Lookup that never touches the network; every derived field stays empty
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineLookup;

#[async_trait]
impl NetworkLookup for OfflineLookup {
    async fn resolve_host(&self, _host: &str) -> LookupResult<Option<IpAddr>> {
        Ok(None)
    }

    async fn domain_registration(&self, domain: &str) -> LookupResult<DomainRecord> {
        Err(LookupError::NotFound(format!("offline: {}", domain)))
    }

    async fn network_registration(&self, ip: IpAddr) -> LookupResult<NetworkRecord> {
        Err(LookupError::NotFound(format!("offline: {}", ip)))
    }
}
