//! Scan driver
//!
//! Transforms every owned asset through the configured sources and persists
//! what they discover.
//!
//! **Per asset:**
//! 1. `transform` (cached sources are rehydrated, the rest are queried)
//! 2. `put` each discovery without overwrite (relation closure included)
//! 3. `put` the asset itself with overwrite, persisting its transform cache
//!
//! Assets are processed by a bounded worker pool. Each asset runs under its
//! own timeout and failures are isolated to that asset. Cancellation is
//! checked between assets, sources and pages; completed cache entries are
//! persisted even when an asset is interrupted.

use crate::assets::Asset;
use crate::error::{InqResult, InquisitorError};
use crate::ownership::owned_assets;
use crate::repository::IntelligenceRepository;
use crate::sources::Source;
use crate::transform::transform;
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ScanSettings {
    /// Assets transformed concurrently
    pub workers: usize,
    /// Ceiling on one asset's transform and persistence
    pub asset_timeout: Duration,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            asset_timeout: Duration::from_secs(300),
        }
    }
}

/// Totals for one scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub assets_transformed: usize,
    pub assets_failed: usize,
    /// Distinct discoveries per asset, summed
    pub discovered: usize,
    /// Discoveries that were not stored before this scan
    pub new_assets: usize,
    pub cancelled: bool,
}

/// Result of scanning one asset
enum AssetScan {
    Done { discovered: usize, new_assets: usize },
    Failed,
    Skipped,
}

pub struct Scanner {
    repo: Arc<IntelligenceRepository>,
    sources: Vec<Arc<dyn Source>>,
    settings: ScanSettings,
    cancel: CancellationToken,
}

impl Scanner {
    pub fn new(
        repo: Arc<IntelligenceRepository>,
        sources: Vec<Arc<dyn Source>>,
        settings: ScanSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            repo,
            sources,
            settings,
            cancel,
        }
    }

    /// Run one scan over the currently owned assets
    ///
    /// Fails before doing any work when no source is configured or nothing
    /// is owned yet.
    pub async fn run(&self) -> InqResult<ScanReport> {
        if self.sources.is_empty() {
            return Err(InquisitorError::NoSources);
        }

        let owned = owned_assets(&self.repo).await?;
        if owned.is_empty() {
            return Err(InquisitorError::NoOwnedAssets);
        }

        let scan_id = Uuid::new_v4();
        let total = owned.len();
        let sources: Vec<String> = self.sources.iter().map(|s| s.kind().to_string()).collect();
        tracing::info!(
            scan_id = %scan_id,
            assets = total,
            sources = ?sources,
            workers = self.settings.workers,
            "Scan started"
        );

        let processed = AtomicUsize::new(0);
        let results: Vec<AssetScan> = stream::iter(owned)
            .map(|asset| {
                let processed = &processed;
                async move {
                    let result = self.scan_asset(scan_id, asset).await;
                    let current = processed.fetch_add(1, Ordering::Relaxed) + 1;
                    if current % 10 == 0 || current == total {
                        tracing::info!(
                            scan_id = %scan_id,
                            progress = format!("{}/{}", current, total),
                            "Scan progress"
                        );
                    }
                    result
                }
            })
            .buffer_unordered(self.settings.workers.max(1))
            .collect()
            .await;

        let mut report = ScanReport {
            cancelled: self.cancel.is_cancelled(),
            ..ScanReport::default()
        };
        for result in results {
            match result {
                AssetScan::Done {
                    discovered,
                    new_assets,
                } => {
                    report.assets_transformed += 1;
                    report.discovered += discovered;
                    report.new_assets += new_assets;
                }
                AssetScan::Failed => report.assets_failed += 1,
                AssetScan::Skipped => {}
            }
        }

        tracing::info!(
            scan_id = %scan_id,
            transformed = report.assets_transformed,
            failed = report.assets_failed,
            discovered = report.discovered,
            new_assets = report.new_assets,
            cancelled = report.cancelled,
            "Scan finished"
        );

        Ok(report)
    }

    async fn scan_asset(&self, scan_id: Uuid, mut asset: Asset) -> AssetScan {
        if self.cancel.is_cancelled() {
            return AssetScan::Skipped;
        }

        tracing::debug!(scan_id = %scan_id, asset = %asset, "Transforming asset");

        match tokio::time::timeout(self.settings.asset_timeout, self.process(&mut asset)).await {
            Ok(Ok((discovered, new_assets))) => AssetScan::Done {
                discovered,
                new_assets,
            },
            Ok(Err(e)) => {
                tracing::error!(scan_id = %scan_id, asset = %asset, error = %e, "Asset scan failed");
                AssetScan::Failed
            }
            Err(_) => {
                tracing::warn!(
                    scan_id = %scan_id,
                    asset = %asset,
                    timeout_secs = self.settings.asset_timeout.as_secs(),
                    "Asset scan timed out"
                );
                // Keep whatever cache entries completed before the timeout
                if let Err(e) = self.repo.put(&asset, true).await {
                    tracing::error!(scan_id = %scan_id, asset = %asset, error = %e, "Failed to persist transform cache");
                }
                AssetScan::Failed
            }
        }
    }

    /// Transform one asset and persist the results; returns (discovered, new)
    async fn process(&self, asset: &mut Asset) -> InqResult<(usize, usize)> {
        let discoveries = transform(asset, &self.repo, &self.sources, &self.cancel).await;

        let mut new_assets = 0;
        for discovery in &discoveries {
            match self.repo.put(discovery, false).await {
                Ok(outcome) if outcome.is_inserted() => {
                    tracing::info!(asset = %asset, found = %discovery, "Found new asset");
                    new_assets += 1;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(asset = %asset, found = %discovery, error = %e, "Failed to store discovery");
                }
            }
        }

        self.repo.put(asset, true).await?;
        Ok((discoveries.len(), new_assets))
    }
}
