//! Ownership inference
//!
//! An explicit classification (accepted/rejected) always wins. An unknown
//! asset is owned iff one of its ownership candidates is stored and owned,
//! tried in order:
//! - Host: parent domain, then registrant
//! - Block: registrant
//! - Email: domain Host
//! - LinkedIn: affiliated registrant
//! - Registrant: none (unknown means not owned)
//!
//! Inference reads stored records only; it never creates assets or performs
//! lookups. Results are not memoized between calls.

use crate::assets::{Asset, AssetRef};
use crate::error::{InqResult, InquisitorError};
use crate::repository::IntelligenceRepository;
use futures::future::BoxFuture;
use std::collections::HashSet;

/// Hop ceiling for one inference chain
pub const MAX_INFERENCE_DEPTH: usize = 64;

/// Whether `asset` belongs to the target organization
pub async fn is_owned(asset: &Asset, repo: &IntelligenceRepository) -> InqResult<bool> {
    let mut visited = HashSet::new();
    infer(asset.clone(), repo, &mut visited, 0).await
}

fn infer<'a>(
    asset: Asset,
    repo: &'a IntelligenceRepository,
    visited: &'a mut HashSet<AssetRef>,
    depth: usize,
) -> BoxFuture<'a, InqResult<bool>> {
    Box::pin(async move {
        if let Some(explicit) = asset.ownership().explicit() {
            return Ok(explicit);
        }
        if depth >= MAX_INFERENCE_DEPTH {
            tracing::warn!(asset = %asset, depth, "Ownership inference depth exceeded");
            return Ok(false);
        }
        if !visited.insert(asset.reference()) {
            return Ok(false);
        }

        for candidate in asset.ownership_candidates() {
            let Some(related) = stored(repo, &candidate).await? else {
                continue;
            };
            if infer(related, repo, visited, depth + 1).await? {
                return Ok(true);
            }
        }

        Ok(false)
    })
}

/// Stored asset for a candidate reference
///
/// A key that no longer canonicalizes is logged and treated as absent.
pub(crate) async fn stored(
    repo: &IntelligenceRepository,
    reference: &AssetRef,
) -> InqResult<Option<Asset>> {
    match repo.get_by_key(reference.kind, &reference.key).await {
        Ok(found) => Ok(found),
        Err(InquisitorError::Validation(e)) => {
            tracing::warn!(related = %reference, error = %e, "Ignoring invalid related key");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Stored asset for `reference`, if it is owned
pub(crate) async fn owned(
    repo: &IntelligenceRepository,
    reference: &AssetRef,
) -> InqResult<Option<Asset>> {
    match stored(repo, reference).await? {
        Some(asset) if is_owned(&asset, repo).await? => Ok(Some(asset)),
        _ => Ok(None),
    }
}

/// Every stored asset that is owned, in storage order
pub async fn owned_assets(repo: &IntelligenceRepository) -> InqResult<Vec<Asset>> {
    let mut owned = Vec::new();
    for asset in repo.query_assets(|_, _| true, None).await? {
        if is_owned(&asset, repo).await? {
            owned.push(asset);
        }
    }
    Ok(owned)
}
