//! Intelligence repository
//!
//! Keyed asset storage over one collection per kind:
//! - at most one record per (kind, canonical key)
//! - `put` inserts an asset and then, recursively, every asset it relates
//!   to (relation closure), stopping at assets already stored or already
//!   visited in the same pass
//! - reads and writes of one record are serialized through a per-key lock
//!
//! Constructing a missing Host or Block (`get_or_create`) performs network
//! lookups through the repository's `NetworkLookup`.

use crate::assets::{Asset, AssetKind, AssetRef, AssetRegistry};
use crate::db::{Collection, SqliteCollection};
use crate::error::InqResult;
use crate::lookup::NetworkLookup;
use crate::utils::KeyLocks;
use futures::future::BoxFuture;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::Arc;

/// What `put` did with the asset it was given
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Inserted(i64),
    Updated(i64),
    /// Already stored and not overwritten (or already visited in this pass)
    Unchanged,
}

impl PutOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, PutOutcome::Inserted(_))
    }
}

pub struct IntelligenceRepository {
    registry: AssetRegistry,
    /// Indexed by `AssetKind as usize`
    collections: [Arc<dyn Collection>; 5],
    lookup: Arc<dyn NetworkLookup>,
    locks: KeyLocks,
}

impl IntelligenceRepository {
    /// Repository over the SQLite record table
    pub fn new(pool: SqlitePool, registry: AssetRegistry, lookup: Arc<dyn NetworkLookup>) -> Self {
        let collections = AssetKind::ALL.map(|kind| {
            Arc::new(SqliteCollection::new(pool.clone(), registry.spec(kind).repository))
                as Arc<dyn Collection>
        });
        Self::with_collections(registry, collections, lookup)
    }

    /// Repository over arbitrary collections, one per kind in `AssetKind::ALL` order
    pub fn with_collections(
        registry: AssetRegistry,
        collections: [Arc<dyn Collection>; 5],
        lookup: Arc<dyn NetworkLookup>,
    ) -> Self {
        Self {
            registry,
            collections,
            lookup,
            locks: KeyLocks::new(),
        }
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub fn lookup(&self) -> &dyn NetworkLookup {
        self.lookup.as_ref()
    }

    fn collection(&self, kind: AssetKind) -> &dyn Collection {
        self.collections[kind as usize].as_ref()
    }

    /// Load the stored asset with canonical key `key`
    async fn load(&self, kind: AssetKind, key: &str) -> InqResult<Option<Asset>> {
        match self.collection(kind).find(key).await? {
            Some(record) => Ok(Some(Asset::from_data(kind, &record.data)?)),
            None => Ok(None),
        }
    }

    /// Stored asset for a raw identifier, canonicalized first
    pub async fn get_by_key(&self, kind: AssetKind, raw: &str) -> InqResult<Option<Asset>> {
        let key = self.registry.canonicalize(kind, raw)?;
        self.load(kind, &key).await
    }

    /// Stored asset for `reference`, whose key is already canonical
    pub async fn get(&self, reference: &AssetRef) -> InqResult<Option<Asset>> {
        self.load(reference.kind, &reference.key).await
    }

    /// Stored asset, or a fresh unclassified one (not persisted)
    ///
    /// A fresh Host or Block runs its derivations, which perform lookups.
    pub async fn get_or_create(&self, kind: AssetKind, raw: &str) -> InqResult<Asset> {
        let key = self.registry.canonicalize(kind, raw)?;
        if let Some(asset) = self.load(kind, &key).await? {
            return Ok(asset);
        }
        tracing::debug!(kind = %kind, key = %key, "Creating asset");
        Ok(Asset::create(kind, &key, self.lookup.as_ref()).await?)
    }

    /// Persist `asset` and its relation closure
    ///
    /// - not stored: insert, then put every related asset with `overwrite = false`
    /// - stored and `overwrite`: update in place, then the same closure step
    /// - stored and not `overwrite`: no-op
    ///
    /// Related assets that fail validation or storage are logged and skipped;
    /// only a failure to store `asset` itself is returned.
    pub async fn put(&self, asset: &Asset, overwrite: bool) -> InqResult<PutOutcome> {
        let mut visited = HashSet::new();
        self.put_inner(asset.clone(), overwrite, &mut visited).await
    }

    fn put_inner<'a>(
        &'a self,
        asset: Asset,
        overwrite: bool,
        visited: &'a mut HashSet<AssetRef>,
    ) -> BoxFuture<'a, InqResult<PutOutcome>> {
        Box::pin(async move {
            let reference = asset.reference();
            if !visited.insert(reference.clone()) {
                return Ok(PutOutcome::Unchanged);
            }

            let outcome = {
                let _guard = self.locks.lock(&reference).await;
                let collection = self.collection(reference.kind);
                match collection.find(&reference.key).await? {
                    None => {
                        let id = collection.store(&reference.key, &asset.to_data()?).await?;
                        tracing::debug!(asset = %reference, id, "Stored asset");
                        PutOutcome::Inserted(id)
                    }
                    Some(existing) if overwrite => {
                        collection.update(existing.id, &asset.to_data()?).await?;
                        PutOutcome::Updated(existing.id)
                    }
                    Some(_) => PutOutcome::Unchanged,
                }
            };

            if outcome == PutOutcome::Unchanged {
                return Ok(outcome);
            }

            for related in asset.relations() {
                if visited.contains(&related) {
                    continue;
                }
                let related_asset = match self.get_or_create(related.kind, &related.key).await {
                    Ok(a) => a,
                    Err(e) => {
                        tracing::warn!(asset = %reference, related = %related, error = %e, "Skipping related asset");
                        continue;
                    }
                };
                if let Err(e) = self.put_inner(related_asset, false, visited).await {
                    tracing::error!(asset = %reference, related = %related, error = %e, "Failed to store related asset");
                }
            }

            Ok(outcome)
        })
    }

    /// Every stored asset for which `predicate(asset, raw_record)` holds
    ///
    /// Kinds are scanned in registry order, records in storage order.
    /// `limit` bounds the number of records examined per kind, not the
    /// result size. Unreadable records are logged and skipped.
    pub async fn query_assets<F>(&self, mut predicate: F, limit: Option<usize>) -> InqResult<Vec<Asset>>
    where
        F: FnMut(&Asset, &Value) -> bool,
    {
        let mut results = Vec::new();

        for spec in self.registry.iter() {
            let records = self.collection(spec.kind).all().await?;
            for record in records.into_iter().take(limit.unwrap_or(usize::MAX)) {
                let asset = match Asset::from_data(spec.kind, &record.data) {
                    Ok(asset) => asset,
                    Err(e) => {
                        tracing::warn!(kind = %spec.kind, id = record.id, error = %e, "Skipping unreadable record");
                        continue;
                    }
                };
                if predicate(&asset, &record.data) {
                    results.push(asset);
                }
            }
        }

        Ok(results)
    }

    /// Every stored asset of one kind, in storage order
    pub async fn assets_of_kind(&self, kind: AssetKind) -> InqResult<Vec<Asset>> {
        self.query_assets(|asset, _| asset.kind() == kind, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{Host, Ownership, Registrant};
    use crate::lookup::{DomainRecord, NetworkRecord, OfflineLookup, StaticLookup};
    use inq_common::db::init_memory_database;

    async fn repo_with(lookup: impl NetworkLookup + 'static) -> IntelligenceRepository {
        let pool = init_memory_database().await.unwrap();
        IntelligenceRepository::new(pool, AssetRegistry::standard(), Arc::new(lookup))
    }

    #[tokio::test]
    async fn test_put_twice_keeps_one_record() {
        let repo = repo_with(OfflineLookup).await;
        let asset = repo.get_or_create(AssetKind::Registrant, "Acme").await.unwrap();

        assert!(repo.put(&asset, false).await.unwrap().is_inserted());
        assert_eq!(repo.put(&asset, false).await.unwrap(), PutOutcome::Unchanged);

        let same = repo.get_or_create(AssetKind::Registrant, " acme ").await.unwrap();
        assert_eq!(repo.put(&same, false).await.unwrap(), PutOutcome::Unchanged);
        assert_eq!(repo.assets_of_kind(AssetKind::Registrant).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_overwrite_updates_in_place() {
        let repo = repo_with(OfflineLookup).await;
        let mut asset = repo.get_or_create(AssetKind::Host, "example.com").await.unwrap();
        let id = match repo.put(&asset, false).await.unwrap() {
            PutOutcome::Inserted(id) => id,
            other => panic!("unexpected {other:?}"),
        };

        asset.set_ownership(Ownership::Accepted);
        assert_eq!(repo.put(&asset, false).await.unwrap(), PutOutcome::Unchanged);
        assert_eq!(
            repo.get_by_key(AssetKind::Host, "example.com").await.unwrap().unwrap().ownership(),
            Ownership::Unknown
        );

        assert_eq!(repo.put(&asset, true).await.unwrap(), PutOutcome::Updated(id));
        assert_eq!(
            repo.get_by_key(AssetKind::Host, "EXAMPLE.com").await.unwrap().unwrap().ownership(),
            Ownership::Accepted
        );
    }

    #[tokio::test]
    async fn test_get_or_create_does_not_persist() {
        let repo = repo_with(OfflineLookup).await;
        repo.get_or_create(AssetKind::Host, "example.com").await.unwrap();
        assert!(repo.get_by_key(AssetKind::Host, "example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_or_create_rejects_invalid() {
        let repo = repo_with(OfflineLookup).await;
        let err = repo.get_or_create(AssetKind::Block, "not-a-cidr").await.unwrap_err();
        assert!(matches!(err, crate::error::InquisitorError::Validation(_)));
    }

    #[tokio::test]
    async fn test_relation_closure_persists_graph() {
        let ip = "192.0.2.10".parse().unwrap();
        let lookup = StaticLookup::new()
            .with_host("www.example.com", ip)
            .with_domain(
                "example.com",
                DomainRecord {
                    organization: Some("Example Inc".into()),
                    emails: vec!["admin@example.com".into()],
                    nameservers: vec![],
                },
            )
            .with_network(
                ip,
                NetworkRecord {
                    cidrs: vec!["192.0.2.0/24".into()],
                    registrant: Some("Example Inc".into()),
                },
            )
            .with_network(
                "192.0.2.0".parse().unwrap(),
                NetworkRecord {
                    cidrs: vec!["192.0.2.0/24".into()],
                    registrant: Some("Example Inc".into()),
                },
            );
        let repo = repo_with(lookup).await;

        let host = repo.get_or_create(AssetKind::Host, "www.example.com").await.unwrap();
        repo.put(&host, false).await.unwrap();

        let all: Vec<String> = repo
            .query_assets(|_, _| true, None)
            .await
            .unwrap()
            .iter()
            .map(|a| a.to_string())
            .collect();
        assert_eq!(
            all,
            vec![
                "Registrant : EXAMPLE INC",
                "Block : 192.0.2.0/24",
                "Host : www.example.com",
                "Host : example.com",
                "Email : admin@example.com",
            ]
        );

        let block = repo.get_by_key(AssetKind::Block, "192.0.2.0/24").await.unwrap().unwrap();
        assert_eq!(block.as_block().unwrap().registrant.as_deref(), Some("EXAMPLE INC"));
    }

    #[tokio::test]
    async fn test_relation_closure_stops_at_stored_assets() {
        let repo = repo_with(OfflineLookup).await;

        // a and b name each other as nameservers
        let mut a = Host::new("a.example.com").unwrap();
        a.nameservers = vec!["b.example.com".into()];
        let mut b = Host::new("b.example.com").unwrap();
        b.nameservers = vec!["a.example.com".into()];

        // Storing b also stores a fresh a (and their parent)
        repo.put(&Asset::from(b), false).await.unwrap();
        assert_eq!(repo.assets_of_kind(AssetKind::Host).await.unwrap().len(), 3);

        let outcome = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            repo.put(&Asset::from(a), true),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(matches!(outcome, PutOutcome::Updated(_)));
        assert_eq!(repo.assets_of_kind(AssetKind::Host).await.unwrap().len(), 3);

        let stored = repo.get_by_key(AssetKind::Host, "a.example.com").await.unwrap().unwrap();
        assert_eq!(stored.as_host().unwrap().nameservers, vec!["b.example.com"]);
    }

    #[tokio::test]
    async fn test_query_limit_is_per_kind() {
        let repo = repo_with(OfflineLookup).await;
        for name in ["A", "B", "C"] {
            repo.put(&Asset::from(Registrant::new(name).unwrap()), false).await.unwrap();
        }
        for host in ["a.example.com", "b.example.com"] {
            let h = Host::new(host).unwrap();
            repo.put(&Asset::from(h), false).await.unwrap();
        }

        let limited = repo.query_assets(|_, _| true, Some(1)).await.unwrap();
        let kinds: Vec<_> = limited.iter().map(|a| a.kind()).collect();
        assert_eq!(kinds, vec![AssetKind::Registrant, AssetKind::Host]);
    }

    #[tokio::test]
    async fn test_query_predicate_sees_raw_record() {
        let repo = repo_with(OfflineLookup).await;
        let mut acme = Asset::from(Registrant::new("Acme").unwrap());
        acme.set_ownership(Ownership::Rejected);
        repo.put(&acme, false).await.unwrap();
        repo.put(&Asset::from(Registrant::new("Other").unwrap()), false).await.unwrap();

        let rejected = repo
            .query_assets(|_, data| data["ownership"] == "rejected", None)
            .await
            .unwrap();
        assert_eq!(rejected, vec![acme]);
    }
}
