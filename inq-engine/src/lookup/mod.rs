//! Registration and DNS lookups
//!
//! Host and Block derivations need three facts from the outside world:
//! - the address a host resolves to
//! - the registration record of the host's registrable domain
//! - the registration record of the network containing an address
//!
//! `NetworkLookup` is the seam; `RdapLookup` is the live implementation and
//! `mock` holds the in-memory and offline ones.

pub mod mock;
pub mod rdap;

pub use mock::{OfflineLookup, StaticLookup};
pub use rdap::RdapLookup;

use crate::error::{LookupError, LookupResult};
use crate::utils::{retry_with_backoff, RetryLimits};
use async_trait::async_trait;
use std::future::Future;
use std::net::IpAddr;

/// Attempts per lookup before a transient failure is given up on
pub const LOOKUP_ATTEMPTS: u32 = 3;

/// Domain registration facts (RDAP domain object)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainRecord {
    pub organization: Option<String>,
    pub emails: Vec<String>,
    pub nameservers: Vec<String>,
}

/// IP network registration facts (RDAP ip network object)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkRecord {
    pub cidrs: Vec<String>,
    pub registrant: Option<String>,
}

#[async_trait]
pub trait NetworkLookup: Send + Sync {
    /// Resolve a host name, preferring IPv4; `Ok(None)` when it does not resolve
    async fn resolve_host(&self, host: &str) -> LookupResult<Option<IpAddr>>;

    async fn domain_registration(&self, domain: &str) -> LookupResult<DomainRecord>;

    async fn network_registration(&self, ip: IpAddr) -> LookupResult<NetworkRecord>;
}

/// Run a lookup, retrying transient failures up to `LOOKUP_ATTEMPTS` times
pub async fn with_retries<F, Fut, T>(operation_name: &str, operation: F) -> LookupResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LookupResult<T>>,
{
    retry_with_backoff(
        operation_name,
        RetryLimits::attempts(LOOKUP_ATTEMPTS),
        LookupError::is_transient,
        operation,
    )
    .await
}
