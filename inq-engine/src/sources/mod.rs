//! OSINT sources
//!
//! A source turns one query string into discovered assets. Sources page
//! through their API until one of these stops them:
//! - the API reports no further results
//! - the per-query page limit
//! - the scan-wide page budget (`QueryBudget`)
//! - cancellation
//! - an API error
//!
//! Whatever was gathered before the stop is returned along with the reason,
//! so callers can keep partial results without treating them as complete.

pub mod extract;
pub mod google;
pub mod mock;
pub mod shodan;

pub use google::GoogleSearch;
pub use mock::MockSource;
pub use shodan::ShodanSearch;

use crate::assets::{Asset, AssetKind};
use crate::error::{InquisitorError, SourceError, SourceResult};
use crate::repository::IntelligenceRepository;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Google,
    Shodan,
}

impl SourceKind {
    pub const ALL: [SourceKind; 2] = [SourceKind::Google, SourceKind::Shodan];

    /// Transform cache key
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Google => "google",
            SourceKind::Shodan => "shodan",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assets discovered by one query, and why paging stopped early (if it did)
#[derive(Debug, Default)]
pub struct QueryOutcome {
    pub assets: Vec<Asset>,
    pub error: Option<SourceError>,
}

impl QueryOutcome {
    /// True when every page the query was entitled to was fetched
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

#[async_trait]
pub trait Source: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Run `query`, materializing discoveries through `repo` (not persisted)
    async fn transform(
        &self,
        repo: &IntelligenceRepository,
        query: &str,
        cancel: &CancellationToken,
    ) -> QueryOutcome;
}

/// Scan-wide page ceiling shared by every worker using a source
#[derive(Debug)]
pub struct QueryBudget {
    limit: Option<u32>,
    used: AtomicU32,
}

impl QueryBudget {
    pub fn new(limit: Option<u32>) -> Self {
        Self {
            limit,
            used: AtomicU32::new(0),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None)
    }

    /// Reserve one page; false once the ceiling is reached
    pub fn try_acquire(&self) -> bool {
        match self.limit {
            None => {
                self.used.fetch_add(1, Ordering::SeqCst);
                true
            }
            Some(limit) => self
                .used
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                    (used < limit).then_some(used + 1)
                })
                .is_ok(),
        }
    }

    pub fn used(&self) -> u32 {
        self.used.load(Ordering::SeqCst)
    }
}

/// One page of API results
#[derive(Debug)]
pub(crate) struct Page<T> {
    pub items: Vec<T>,
    /// Total matches reported by the API, when it reports one
    pub total: Option<u64>,
    /// The API says there is no next page
    pub last: bool,
}

/// Fetch pages 1, 2, ... of `query` until a stop condition
///
/// Returns the items gathered and the error that cut paging short, if any.
pub(crate) async fn paginate<T, F, Fut>(
    source: SourceKind,
    query: &str,
    page_limit: Option<u32>,
    budget: &QueryBudget,
    cancel: &CancellationToken,
    mut fetch: F,
) -> (Vec<T>, Option<SourceError>)
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = SourceResult<Page<T>>>,
{
    let mut items = Vec::new();
    let mut page = 1u32;

    loop {
        if cancel.is_cancelled() {
            return (items, Some(SourceError::Cancelled));
        }
        if page_limit.is_some_and(|limit| page > limit) {
            break;
        }
        if !budget.try_acquire() {
            tracing::warn!(source = %source, query, "Page budget exhausted");
            return (items, Some(SourceError::QuotaExhausted(source.to_string())));
        }

        match fetch(page).await {
            Ok(result) => {
                let empty = result.items.is_empty();
                items.extend(result.items);
                let reached_total = result
                    .total
                    .is_some_and(|total| items.len() as u64 >= total);
                if empty || result.last || reached_total {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(source = %source, query, page, error = %e, "Stopped paging");
                return (items, Some(e));
            }
        }

        page += 1;
    }

    tracing::debug!(source = %source, query, pages = page, items = items.len(), "Query complete");
    (items, None)
}

/// A raw identifier pulled out of an API result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Discovery {
    pub kind: AssetKind,
    pub raw: String,
    /// Organization reported alongside a LinkedIn profile
    pub affiliation: Option<String>,
}

impl Discovery {
    pub fn new(kind: AssetKind, raw: impl Into<String>) -> Self {
        Self {
            kind,
            raw: raw.into(),
            affiliation: None,
        }
    }
}

/// Turn discoveries into assets via `get_or_create`, skipping invalid ones
pub async fn materialize(repo: &IntelligenceRepository, discoveries: Vec<Discovery>) -> Vec<Asset> {
    let mut seen = HashSet::new();
    let mut assets = Vec::new();

    for discovery in discoveries {
        let mut asset = match repo.get_or_create(discovery.kind, &discovery.raw).await {
            Ok(asset) => asset,
            Err(InquisitorError::Validation(e)) => {
                tracing::warn!(kind = %discovery.kind, input = %discovery.raw, error = %e, "Skipping invalid discovery");
                continue;
            }
            Err(e) => {
                tracing::error!(kind = %discovery.kind, input = %discovery.raw, error = %e, "Failed to materialize discovery");
                continue;
            }
        };

        let affiliation_changed = match (&mut asset, discovery.affiliation.as_deref()) {
            (Asset::LinkedIn(profile), Some(org)) => {
                let previous = profile.affiliation.clone();
                profile.set_affiliation(org);
                profile.affiliation != previous
            }
            _ => false,
        };
        if affiliation_changed {
            persist_if_stored(repo, &asset).await;
        }

        if seen.insert(asset.reference()) {
            assets.push(asset);
        }
    }

    assets
}

/// Overwrite the stored record of `asset`, if there is one
///
/// New assets are left to the caller's insert.
async fn persist_if_stored(repo: &IntelligenceRepository, asset: &Asset) {
    match repo.get(&asset.reference()).await {
        Ok(Some(_)) => {
            if let Err(e) = repo.put(asset, true).await {
                tracing::error!(asset = %asset, error = %e, "Failed to update discovered asset");
            } else {
                tracing::info!(asset = %asset, "Updated affiliation of known profile");
            }
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!(asset = %asset, error = %e, "Failed to read discovered asset");
        }
    }
}

/// Resolved settings for one source
#[derive(Debug, Clone, Default)]
pub struct SourceSettings {
    pub page_limit: Option<u32>,
    pub page_budget: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct GoogleCredentials {
    pub dev_key: String,
    pub cse_id: String,
}

/// Everything needed to construct the configured sources
#[derive(Debug, Clone, Default)]
pub struct SourcesConfig {
    pub google: Option<GoogleCredentials>,
    pub google_settings: SourceSettings,
    pub shodan_api_key: Option<String>,
    pub shodan_settings: SourceSettings,
    pub request_timeout: Duration,
}

/// Build every source with valid credentials
///
/// Missing credentials and missing quota limits produce warnings; the scan
/// proceeds with whatever sources remain.
pub fn build_sources(config: &SourcesConfig) -> Vec<Arc<dyn Source>> {
    let mut sources: Vec<Arc<dyn Source>> = Vec::new();

    match &config.google {
        Some(creds) => match GoogleSearch::new(creds.clone(), config.google_settings.clone(), config.request_timeout) {
            Ok(google) => {
                if config.google_settings.page_limit.is_none() {
                    tracing::warn!("No Google page limit configured; queries may consume a large share of the daily quota");
                }
                sources.push(Arc::new(google));
            }
            Err(e) => tracing::warn!(error = %e, "Google source unavailable"),
        },
        None => tracing::warn!("Google credentials missing or incomplete; Google transforms disabled"),
    }

    match &config.shodan_api_key {
        Some(key) => match ShodanSearch::new(key.clone(), config.shodan_settings.clone(), config.request_timeout) {
            Ok(shodan) => {
                if config.shodan_settings.page_limit.is_none() {
                    tracing::warn!("No Shodan page limit configured; queries may consume a large number of query credits");
                }
                sources.push(Arc::new(shodan));
            }
            Err(e) => tracing::warn!(error = %e, "Shodan source unavailable"),
        },
        None => tracing::warn!("Shodan API key missing; Shodan transforms disabled"),
    }

    sources
}
