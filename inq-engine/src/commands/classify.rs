//! `classify` command
//!
//! Manually sets the ownership of assets. The whole batch is validated and
//! checked for conflicts before anything is written:
//! - the same raw value in two buckets (accept/unmark/reject) of one kind
//! - two raw values that canonicalize to the same key in different buckets
//!
//! Existing records keep their data and transform cache; only ownership
//! changes. New assets are created (with derivations) and stored with
//! relation closure.

use crate::assets::{AssetKind, Ownership};
use crate::error::{InqResult, InquisitorError};
use crate::repository::{IntelligenceRepository, PutOutcome};
use std::collections::{BTreeMap, BTreeSet};

/// Raw values to classify, per kind and target ownership
#[derive(Debug, Clone, Default)]
pub struct ClassifyRequest {
    entries: Vec<(AssetKind, Ownership, String)>,
}

impl ClassifyRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: AssetKind, ownership: Ownership, values: &[String]) {
        self.entries
            .extend(values.iter().map(|v| (kind, ownership, v.clone())));
    }

    pub fn with(mut self, kind: AssetKind, ownership: Ownership, values: &[&str]) -> Self {
        self.entries
            .extend(values.iter().map(|v| (kind, ownership, v.to_string())));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifyReport {
    /// Assets whose ownership was written
    pub classified: usize,
    /// Of those, assets that were not stored before
    pub created: usize,
}

/// Keys of `kind` that appear under more than one ownership
fn conflicts<'a>(
    kind: AssetKind,
    keys: impl Iterator<Item = (AssetKind, Ownership, &'a str)>,
) -> Vec<String> {
    let mut buckets: BTreeMap<&str, BTreeSet<Ownership>> = BTreeMap::new();
    for (k, ownership, key) in keys {
        if k == kind {
            buckets.entry(key).or_default().insert(ownership);
        }
    }
    buckets
        .into_iter()
        .filter(|(_, owners)| owners.len() > 1)
        .map(|(key, _)| key.to_string())
        .collect()
}

fn check_conflicts<'a>(
    entries: impl Iterator<Item = (AssetKind, Ownership, &'a str)> + Clone,
) -> InqResult<()> {
    for kind in AssetKind::ALL {
        let keys = conflicts(kind, entries.clone());
        if !keys.is_empty() {
            return Err(InquisitorError::ConflictingClassification { kind, keys });
        }
    }
    Ok(())
}

/// Validate, conflict-check and then apply a classification batch
pub async fn classify(repo: &IntelligenceRepository, request: &ClassifyRequest) -> InqResult<ClassifyReport> {
    check_conflicts(request.entries.iter().map(|(k, o, raw)| (*k, *o, raw.as_str())))?;

    let mut canonical = Vec::with_capacity(request.entries.len());
    for (kind, ownership, raw) in &request.entries {
        let key = repo.registry().canonicalize(*kind, raw)?;
        canonical.push((*kind, *ownership, key));
    }
    check_conflicts(canonical.iter().map(|(k, o, key)| (*k, *o, key.as_str())))?;

    // Duplicates within one bucket collapse to a single write
    let targets: BTreeSet<(AssetKind, String, Ownership)> = canonical
        .into_iter()
        .map(|(kind, ownership, key)| (kind, key, ownership))
        .collect();

    let mut report = ClassifyReport::default();
    for (kind, key, ownership) in targets {
        let mut asset = repo.get_or_create(kind, &key).await?;
        asset.set_ownership(ownership);
        let outcome = repo.put(&asset, true).await?;
        if matches!(outcome, PutOutcome::Inserted(_)) {
            report.created += 1;
        }
        report.classified += 1;
        tracing::info!(asset = %asset, ownership = ownership.as_str(), "Classified asset");
    }

    Ok(report)
}
