//! Shodan host search source
//!
//! API Documentation: https://developer.shodan.io/api
//!
//! Per match, `isp` and `org` become Registrants; `_shodan.options.hostname`,
//! `http.host`, `hostnames[]` and `domains[]` become Hosts. Paging continues
//! until the reported total has been collected.

use super::{
    materialize, paginate, Discovery, Page, QueryBudget, QueryOutcome, Source, SourceKind,
    SourceSettings,
};
use crate::assets::AssetKind;
use crate::error::{InqResult, InquisitorError, SourceError, SourceResult};
use crate::repository::IntelligenceRepository;
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::num::NonZeroU32;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const DEFAULT_BASE_URL: &str = "https://api.shodan.io";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    matches: Vec<Value>,
    total: Option<u64>,
}

/// Raw identifiers found in one search match
pub(crate) fn match_discoveries(item: &Value) -> Vec<Discovery> {
    let mut found = Vec::new();

    for field in ["isp", "org"] {
        if let Some(name) = item.get(field).and_then(Value::as_str) {
            found.push(Discovery::new(AssetKind::Registrant, name));
        }
    }

    let single_hosts = [
        item.pointer("/_shodan/options/hostname"),
        item.pointer("/http/host"),
    ];
    for host in single_hosts.into_iter().flatten().filter_map(Value::as_str) {
        found.push(Discovery::new(AssetKind::Host, host));
    }

    for field in ["hostnames", "domains"] {
        let hosts = item.get(field).and_then(Value::as_array);
        for host in hosts.into_iter().flatten().filter_map(Value::as_str) {
            found.push(Discovery::new(AssetKind::Host, host));
        }
    }

    found
}

pub struct ShodanSearch {
    client: Client,
    api_key: String,
    settings: SourceSettings,
    budget: QueryBudget,
    base_url: String,
    rate_limiter: DefaultDirectRateLimiter,
}

impl ShodanSearch {
    pub fn new(api_key: String, settings: SourceSettings, request_timeout: Duration) -> InqResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent(inq_common::config::user_agent())
            .build()
            .map_err(|e| InquisitorError::Config(format!("Failed to build HTTP client: {}", e)))?;

        // 1 request per second (Shodan API policy)
        let rate_limiter =
            RateLimiter::direct(Quota::per_second(NonZeroU32::new(1).expect("1 is non-zero")));

        Ok(Self {
            client,
            api_key,
            budget: QueryBudget::new(settings.page_budget),
            settings,
            base_url: DEFAULT_BASE_URL.to_string(),
            rate_limiter,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_page(&self, query: &str, page: u32) -> SourceResult<Page<Value>> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/shodan/host/search", self.base_url.trim_end_matches('/'));
        let page_param = page.to_string();
        let params = [
            ("key", self.api_key.as_str()),
            ("query", query),
            ("page", page_param.as_str()),
        ];

        tracing::debug!(query, page, "Querying Shodan host search");

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(format!("Shodan request failed: {}", e)))?;

        let status = response.status();
        match status {
            s if s.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(SourceError::Auth(format!("Shodan returned {}", status)));
            }
            StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
                return Err(SourceError::Unavailable(format!("Shodan returned {}", status)));
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                return Err(SourceError::Http(status.as_u16(), body));
            }
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Shodan response: {}", e)))?;

        Ok(Page {
            items: body.matches,
            total: body.total,
            last: false,
        })
    }
}

#[async_trait]
impl Source for ShodanSearch {
    fn kind(&self) -> SourceKind {
        SourceKind::Shodan
    }

    async fn transform(
        &self,
        repo: &IntelligenceRepository,
        query: &str,
        cancel: &CancellationToken,
    ) -> QueryOutcome {
        let (matches, error) = paginate(
            SourceKind::Shodan,
            query,
            self.settings.page_limit,
            &self.budget,
            cancel,
            |page| self.fetch_page(query, page),
        )
        .await;

        let discoveries = matches.iter().flat_map(match_discoveries).collect();
        QueryOutcome {
            assets: materialize(repo, discoveries).await,
            error,
        }
    }
}
