//! Live lookups: system resolver for DNS, RDAP for registration data
//!
//! RDAP queries go through the rdap.org bootstrap redirector, which forwards
//! each query to the authoritative registry. Requests are rate limited to
//! 2 per second across all callers sharing the client.

use super::{DomainRecord, NetworkLookup, NetworkRecord};
use crate::error::{InqResult, InquisitorError, LookupError, LookupResult};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://rdap.org";

/// RDAP requests per second
const RDAP_RATE_PER_SEC: u32 = 2;

#[derive(Debug, Default, Deserialize)]
struct RdapEntity {
    #[serde(default)]
    roles: Vec<String>,
    #[serde(rename = "vcardArray")]
    vcard_array: Option<Value>,
    #[serde(default)]
    entities: Vec<RdapEntity>,
}

#[derive(Debug, Deserialize)]
struct RdapNameserver {
    #[serde(rename = "ldhName")]
    ldh_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RdapDomain {
    #[serde(default)]
    entities: Vec<RdapEntity>,
    #[serde(default)]
    nameservers: Vec<RdapNameserver>,
}

#[derive(Debug, Deserialize)]
struct Cidr0 {
    v4prefix: Option<String>,
    v6prefix: Option<String>,
    length: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct RdapNetwork {
    #[serde(default)]
    cidr0_cidrs: Vec<Cidr0>,
    #[serde(default)]
    entities: Vec<RdapEntity>,
}

impl RdapEntity {
    fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    /// Text values of vCard property `name` (jCard: `["vcard", [[name, params, type, value], ...]]`)
    fn vcard(&self, name: &str) -> Vec<String> {
        let Some(props) = self
            .vcard_array
            .as_ref()
            .and_then(|v| v.get(1))
            .and_then(Value::as_array)
        else {
            return Vec::new();
        };

        props
            .iter()
            .filter_map(Value::as_array)
            .filter(|p| p.first().and_then(Value::as_str) == Some(name))
            .filter_map(|p| match p.get(3) {
                Some(Value::String(s)) => Some(s.clone()),
                // Structured values (e.g. org with units): first component
                Some(Value::Array(parts)) => parts.first().and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .filter(|s| !s.trim().is_empty())
            .collect()
    }

    fn walk<'a>(&'a self, out: &mut Vec<&'a RdapEntity>) {
        out.push(self);
        for child in &self.entities {
            child.walk(out);
        }
    }
}

fn flatten(entities: &[RdapEntity]) -> Vec<&RdapEntity> {
    let mut out = Vec::new();
    for e in entities {
        e.walk(&mut out);
    }
    out
}

fn domain_record(body: RdapDomain) -> DomainRecord {
    let entities = flatten(&body.entities);

    let organization = entities
        .iter()
        .filter(|e| e.has_role("registrant"))
        .find_map(|e| {
            e.vcard("org")
                .into_iter()
                .next()
                .or_else(|| e.vcard("fn").into_iter().next())
        });

    let mut emails: Vec<String> = entities.iter().flat_map(|e| e.vcard("email")).collect();
    emails.sort();
    emails.dedup();

    let nameservers = body
        .nameservers
        .into_iter()
        .filter_map(|ns| ns.ldh_name)
        .collect();

    DomainRecord {
        organization,
        emails,
        nameservers,
    }
}

fn network_record(body: RdapNetwork) -> NetworkRecord {
    let cidrs = body
        .cidr0_cidrs
        .iter()
        .filter_map(|c| {
            let prefix = c.v4prefix.as_deref().or(c.v6prefix.as_deref())?;
            Some(format!("{}/{}", prefix, c.length?))
        })
        .collect();

    let registrant = flatten(&body.entities)
        .into_iter()
        .filter(|e| e.has_role("registrant"))
        .filter(|e| e.vcard("kind").iter().any(|k| k.eq_ignore_ascii_case("org")))
        .find_map(|e| e.vcard("fn").into_iter().next());

    NetworkRecord { cidrs, registrant }
}

/// Live DNS + RDAP lookup client
pub struct RdapLookup {
    client: Client,
    base_url: String,
    dns_timeout: Duration,
    rate_limiter: DefaultDirectRateLimiter,
}

impl RdapLookup {
    pub fn new(request_timeout: Duration) -> InqResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent(inq_common::config::user_agent())
            .build()
            .map_err(|e| InquisitorError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let rate_limiter = RateLimiter::direct(Quota::per_second(
            NonZeroU32::new(RDAP_RATE_PER_SEC).expect("rate is non-zero"),
        ));

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            dns_timeout: request_timeout,
            rate_limiter,
        })
    }

    /// Point RDAP queries at a different server
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> LookupResult<T> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        tracing::debug!(url = %url, "RDAP query");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/rdap+json, application/json")
            .send()
            .await
            .map_err(|e| LookupError::Transient(format!("RDAP request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound(path.to_string()));
        }
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(LookupError::Transient(format!("RDAP returned {} for {}", status, path)));
        }
        if !status.is_success() {
            return Err(LookupError::NotFound(format!("RDAP returned {} for {}", status, path)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| LookupError::Malformed(format!("{}: {}", path, e)))
    }
}

#[async_trait]
impl NetworkLookup for RdapLookup {
    async fn resolve_host(&self, host: &str) -> LookupResult<Option<IpAddr>> {
        let resolved = tokio::time::timeout(self.dns_timeout, tokio::net::lookup_host((host, 0)))
            .await
            .map_err(|_| LookupError::Transient(format!("DNS timeout for {}", host)))?;

        let addrs: Vec<IpAddr> = match resolved {
            Ok(addrs) => addrs.map(|a| a.ip()).collect(),
            Err(e) => {
                tracing::debug!(host, error = %e, "DNS resolution failed");
                return Ok(None);
            }
        };

        Ok(addrs
            .iter()
            .find(|ip| ip.is_ipv4())
            .or_else(|| addrs.first())
            .copied())
    }

    async fn domain_registration(&self, domain: &str) -> LookupResult<DomainRecord> {
        let body: RdapDomain = self.fetch(&format!("domain/{}", domain)).await?;
        Ok(domain_record(body))
    }

    async fn network_registration(&self, ip: IpAddr) -> LookupResult<NetworkRecord> {
        let body: RdapNetwork = self.fetch(&format!("ip/{}", ip)).await?;
        Ok(network_record(body))
    }
}
