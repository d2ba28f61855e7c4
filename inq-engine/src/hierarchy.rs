//! Parent-asset resolution for the hierarchy view
//!
//! The parent of an owned asset is its nearest owned enclosing asset:
//! - Host: owned parent domain, else the smallest owned Block containing
//!   its address, else its owned registrant
//! - Block: the smallest other owned Block strictly containing it, else its
//!   owned registrant
//! - Email: owned domain Host
//! - LinkedIn: owned affiliated registrant
//! - Registrant: none
//!
//! "Smallest" means fewest addresses, then lowest network address.
//! Ownership is not affected by any of this.

use crate::assets::{Asset, AssetKind, AssetRef};
use crate::error::InqResult;
use crate::ownership::{self, is_owned};
use crate::repository::IntelligenceRepository;
use ipnet::IpNet;
use std::net::IpAddr;

/// Whether `parent` covers all of `child` and is strictly larger
///
/// Never true for a block and itself, nor across address families.
pub fn strictly_contains(parent: &IpNet, child: &IpNet) -> bool {
    let same_family = matches!(
        (parent, child),
        (IpNet::V4(_), IpNet::V4(_)) | (IpNet::V6(_), IpNet::V6(_))
    );
    same_family
        && parent.prefix_len() < child.prefix_len()
        && parent.network() <= child.network()
        && child.broadcast() <= parent.broadcast()
}

/// Ordering key: fewest addresses first, then lowest network address
fn size_key(net: &IpNet) -> (u8, IpAddr) {
    (net.max_prefix_len() - net.prefix_len(), net.network())
}

/// Owned blocks, loaded once and reused across many parent lookups
pub struct Hierarchy<'a> {
    repo: &'a IntelligenceRepository,
    owned_blocks: Vec<(IpNet, Asset)>,
}

impl<'a> Hierarchy<'a> {
    pub async fn load(repo: &'a IntelligenceRepository) -> InqResult<Self> {
        let mut owned_blocks = Vec::new();
        for asset in repo.assets_of_kind(AssetKind::Block).await? {
            let Some(network) = asset.as_block().and_then(|b| b.network()) else {
                continue;
            };
            if is_owned(&asset, repo).await? {
                owned_blocks.push((network, asset));
            }
        }
        Ok(Self { repo, owned_blocks })
    }

    /// Smallest owned block satisfying `accept`
    fn smallest_block(&self, accept: impl Fn(&IpNet) -> bool) -> Option<Asset> {
        self.owned_blocks
            .iter()
            .filter(|(net, _)| accept(net))
            .min_by_key(|(net, _)| size_key(net))
            .map(|(_, asset)| asset.clone())
    }

    async fn owned_ref(&self, kind: AssetKind, key: Option<&String>) -> InqResult<Option<Asset>> {
        match key {
            Some(key) => ownership::owned(self.repo, &AssetRef::new(kind, key.as_str())).await,
            None => Ok(None),
        }
    }

    /// Nearest owned enclosing asset, if any
    pub async fn parent_of(&self, asset: &Asset) -> InqResult<Option<Asset>> {
        match asset {
            Asset::Registrant(_) => Ok(None),
            Asset::Host(host) => {
                if let Some(parent) = self.owned_ref(AssetKind::Host, host.parent.as_ref()).await? {
                    return Ok(Some(parent));
                }
                if let Some(ip) = host.ip {
                    if let Some(block) = self.smallest_block(|net| net.contains(&ip)) {
                        return Ok(Some(block));
                    }
                }
                self.owned_ref(AssetKind::Registrant, host.registrant.as_ref()).await
            }
            Asset::Block(block) => {
                if let Some(network) = block.network() {
                    if let Some(parent) = self.smallest_block(|net| strictly_contains(net, &network)) {
                        return Ok(Some(parent));
                    }
                }
                self.owned_ref(AssetKind::Registrant, block.registrant.as_ref()).await
            }
            Asset::Email(email) => self.owned_ref(AssetKind::Host, Some(&email.domain)).await,
            Asset::LinkedIn(profile) => {
                self.owned_ref(AssetKind::Registrant, profile.affiliation.as_ref()).await
            }
        }
    }
}

/// Nearest owned enclosing asset of `asset`
///
/// Loads the owned blocks on every call; use `Hierarchy` when resolving
/// parents for many assets.
pub async fn parent_asset(asset: &Asset, repo: &IntelligenceRepository) -> InqResult<Option<Asset>> {
    Hierarchy::load(repo).await?.parent_of(asset).await
}
