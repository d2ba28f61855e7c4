//! Google Custom Search source
//!
//! API Documentation: https://developers.google.com/custom-search/v1/reference/rest/v1/cse/list
//!
//! Per result item:
//! - the link's host becomes a Host
//! - email addresses in the snippet become Emails
//! - linkedin.com links become LinkedIn profiles, affiliated with
//!   `pagemap.person[].org` when present

use super::{
    extract, materialize, paginate, Discovery, GoogleCredentials, Page, QueryBudget, QueryOutcome,
    Source, SourceKind, SourceSettings,
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

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// Results per page (fixed by the API)
const PAGE_SIZE: u32 = 10;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
    queries: Option<SearchQueries>,
    #[serde(rename = "searchInformation")]
    search_information: Option<SearchInformation>,
}

#[derive(Debug, Deserialize)]
struct SearchQueries {
    #[serde(rename = "nextPage", default)]
    next_page: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct SearchInformation {
    #[serde(rename = "totalResults")]
    total_results: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchItem {
    link: Option<String>,
    #[serde(default)]
    snippet: String,
    pagemap: Option<Pagemap>,
}

#[derive(Debug, Deserialize)]
struct Pagemap {
    #[serde(default)]
    person: Vec<PagemapPerson>,
}

#[derive(Debug, Deserialize)]
struct PagemapPerson {
    org: Option<String>,
}

/// Raw identifiers found in one result item
pub(crate) fn item_discoveries(item: &SearchItem) -> Vec<Discovery> {
    let mut found = Vec::new();

    let host = item.link.as_deref().and_then(extract::link_host);
    if let Some(host) = &host {
        found.push(Discovery::new(AssetKind::Host, host.as_str()));
    }

    found.extend(
        extract::emails(&item.snippet)
            .into_iter()
            .map(|e| Discovery::new(AssetKind::Email, e)),
    );

    if let (Some(link), Some(host)) = (&item.link, &host) {
        if host == "linkedin.com" || host.ends_with(".linkedin.com") {
            let affiliation = item
                .pagemap
                .as_ref()
                .and_then(|p| p.person.iter().find_map(|person| person.org.clone()));
            found.push(Discovery {
                kind: AssetKind::LinkedIn,
                raw: link.clone(),
                affiliation,
            });
        }
    }

    found
}

pub struct GoogleSearch {
    client: Client,
    credentials: GoogleCredentials,
    settings: SourceSettings,
    budget: QueryBudget,
    base_url: String,
    rate_limiter: DefaultDirectRateLimiter,
}

impl GoogleSearch {
    pub fn new(
        credentials: GoogleCredentials,
        settings: SourceSettings,
        request_timeout: Duration,
    ) -> InqResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent(inq_common::config::user_agent())
            .build()
            .map_err(|e| InquisitorError::Config(format!("Failed to build HTTP client: {}", e)))?;

        // 1 request per second
        let rate_limiter =
            RateLimiter::direct(Quota::per_second(NonZeroU32::new(1).expect("1 is non-zero")));

        Ok(Self {
            client,
            budget: QueryBudget::new(settings.page_budget),
            credentials,
            settings,
            base_url: DEFAULT_BASE_URL.to_string(),
            rate_limiter,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_page(&self, query: &str, page: u32) -> SourceResult<Page<SearchItem>> {
        self.rate_limiter.until_ready().await;

        let start = (1 + PAGE_SIZE * (page - 1)).to_string();
        let params = [
            ("key", self.credentials.dev_key.as_str()),
            ("cx", self.credentials.cse_id.as_str()),
            ("q", query),
            ("start", start.as_str()),
        ];

        tracing::debug!(query, page, "Querying Google Custom Search");

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(format!("Google request failed: {}", e)))?;

        let status = response.status();
        match status {
            s if s.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(SourceError::Auth(format!("Google returned {}", status)));
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(SourceError::QuotaExhausted("google".to_string()));
            }
            s if s.is_server_error() => {
                return Err(SourceError::Unavailable(format!("Google returned {}", status)));
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                return Err(SourceError::Http(status.as_u16(), body));
            }
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Google response: {}", e)))?;

        let last = body.queries.map(|q| q.next_page.is_empty()).unwrap_or(true);
        let total = body
            .search_information
            .and_then(|s| s.total_results)
            .and_then(|t| t.parse().ok());

        Ok(Page {
            items: body.items,
            total,
            last,
        })
    }
}

#[async_trait]
impl Source for GoogleSearch {
    fn kind(&self) -> SourceKind {
        SourceKind::Google
    }

    async fn transform(
        &self,
        repo: &IntelligenceRepository,
        query: &str,
        cancel: &CancellationToken,
    ) -> QueryOutcome {
        let (items, error) = paginate(
            SourceKind::Google,
            query,
            self.settings.page_limit,
            &self.budget,
            cancel,
            |page| self.fetch_page(query, page),
        )
        .await;

        let discoveries = items.iter().flat_map(item_discoveries).collect();
        QueryOutcome {
            assets: materialize(repo, discoveries).await,
            error,
        }
    }
}
