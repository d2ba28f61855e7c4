//! Per-asset write serialization
//!
//! Scan workers run concurrently over independent assets, but two workers
//! can discover the same asset at once. Every read-modify-write of a record
//! goes through the lock for its (kind, key).

use crate::assets::AssetRef;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Map size above which idle entries are dropped
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: Mutex<HashMap<AssetRef, Arc<AsyncMutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `asset`, waiting if another task holds it
    pub async fn lock(&self, asset: &AssetRef) -> OwnedMutexGuard<()> {
        let entry = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            if locks.len() > PRUNE_THRESHOLD {
                // Only this map holds an idle entry
                locks.retain(|_, m| Arc::strong_count(m) > 1);
            }
            locks
                .entry(asset.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        entry.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetKind;
    use std::time::Duration;

    fn host(key: &str) -> AssetRef {
        AssetRef::new(AssetKind::Host, key)
    }

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyLocks::new());
        let guard = locks.lock(&host("example.com")).await;

        let locks2 = Arc::clone(&locks);
        let waiter = tokio::spawn(async move {
            let _g = locks2.lock(&host("example.com")).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let locks = KeyLocks::new();
        let _a = locks.lock(&host("a.example.com")).await;
        let _b = tokio::time::timeout(Duration::from_secs(1), locks.lock(&host("b.example.com")))
            .await
            .unwrap();
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_kind_is_part_of_identity() {
        let locks = KeyLocks::new();
        let _a = locks.lock(&host("example")).await;
        let _b = tokio::time::timeout(
            Duration::from_secs(1),
            locks.lock(&AssetRef::new(AssetKind::Registrant, "example")),
        )
        .await
        .unwrap();
    }
}
