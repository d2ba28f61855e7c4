//! Repository construction for tests

use inq_engine::assets::AssetRegistry;
use inq_engine::lookup::NetworkLookup;
use inq_engine::IntelligenceRepository;
use std::sync::Arc;
use tempfile::TempDir;

/// Repository over a private in-memory database
pub async fn memory_repository(lookup: impl NetworkLookup + 'static) -> Arc<IntelligenceRepository> {
    let pool = inq_common::db::init_memory_database().await.unwrap();
    Arc::new(IntelligenceRepository::new(
        pool,
        AssetRegistry::standard(),
        Arc::new(lookup),
    ))
}

/// Repository over a file database in a temporary directory
///
/// Returns (TempDir, repository) - TempDir must be kept alive for duration of test
pub async fn file_repository(
    lookup: impl NetworkLookup + 'static,
) -> (TempDir, Arc<IntelligenceRepository>) {
    let temp_dir = TempDir::new().unwrap();
    let pool = inq_common::db::init_database(&temp_dir.path().join("inquisitor.db"))
        .await
        .unwrap();
    let repo = Arc::new(IntelligenceRepository::new(
        pool,
        AssetRegistry::standard(),
        Arc::new(lookup),
    ));
    (temp_dir, repo)
}

/// Fresh repository over the database a previous `file_repository` created
pub async fn reopen_repository(
    dir: &TempDir,
    lookup: impl NetworkLookup + 'static,
) -> Arc<IntelligenceRepository> {
    let pool = inq_common::db::init_database(&dir.path().join("inquisitor.db"))
        .await
        .unwrap();
    Arc::new(IntelligenceRepository::new(
        pool,
        AssetRegistry::standard(),
        Arc::new(lookup),
    ))
}
