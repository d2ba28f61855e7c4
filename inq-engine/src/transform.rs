//! Transform orchestration
//!
//! For each source, an asset's queries run at most once: results are
//! memoized in the asset's transform cache as (kind, key) references and
//! later scans rehydrate them from the repository instead of re-querying.
//!
//! Whatever a source returned is cached, partial results included, as soon
//! as one of its queries reached the API; quota already spent is never spent
//! again. A source cancelled before any query was sent gets no entry and is
//! queried on the next scan.

use crate::assets::{Asset, AssetRef};
use crate::error::SourceError;
use crate::repository::IntelligenceRepository;
use crate::sources::Source;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Discover assets related to `asset` through every source
///
/// Updates `asset`'s transform cache in place; the caller persists both
/// the returned discoveries and `asset` itself.
pub async fn transform(
    asset: &mut Asset,
    repo: &IntelligenceRepository,
    sources: &[Arc<dyn Source>],
    cancel: &CancellationToken,
) -> Vec<Asset> {
    let mut seen = HashSet::new();
    let mut discovered = Vec::new();

    for source in sources {
        if cancel.is_cancelled() {
            break;
        }

        let found = match asset.cached_transform(source.kind()) {
            Some(cached) => {
                tracing::debug!(asset = %asset, source = %source.kind(), cached = cached.len(), "Using cached transform");
                rehydrate(repo, cached).await
            }
            None => query_source(asset, repo, source.as_ref(), cancel).await,
        };

        for item in found {
            if seen.insert(item.reference()) {
                discovered.push(item);
            }
        }
    }

    discovered
}

/// Run every query `asset` has for `source` and cache what was gathered
async fn query_source(
    asset: &mut Asset,
    repo: &IntelligenceRepository,
    source: &dyn Source,
    cancel: &CancellationToken,
) -> Vec<Asset> {
    let kind = source.kind();
    let queries = asset.transform_queries(kind);
    if queries.is_empty() {
        return Vec::new();
    }

    let mut found = Vec::new();
    let mut queried = false;

    for query in &queries {
        if cancel.is_cancelled() {
            break;
        }

        tracing::info!(asset = %asset, source = %kind, query = %query, "Querying source");
        let outcome = source.transform(repo, query, cancel).await;
        match &outcome.error {
            // Cancelled before the first page went out
            Some(SourceError::Cancelled) if outcome.assets.is_empty() => break,
            Some(e) => {
                tracing::warn!(asset = %asset, source = %kind, query = %query, error = %e, "Source query incomplete; caching partial results");
            }
            None => {}
        }
        queried = true;
        found.extend(outcome.assets);
    }

    if queried {
        let refs: Vec<AssetRef> = found.iter().map(Asset::reference).collect();
        asset.cache_transform(kind, &refs);
    }

    found
}

/// Load (or recreate) the assets a cache entry refers to
async fn rehydrate(repo: &IntelligenceRepository, cached: &[AssetRef]) -> Vec<Asset> {
    let mut assets = Vec::with_capacity(cached.len());
    for reference in cached {
        match repo.get_or_create(reference.kind, &reference.key).await {
            Ok(asset) => assets.push(asset),
            Err(e) => {
                tracing::warn!(related = %reference, error = %e, "Skipping cached discovery");
            }
        }
    }
    assets
}
