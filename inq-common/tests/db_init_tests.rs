//! Database initialization tests

use inq_common::db::{init_database, init_memory_database};
use sqlx::Row;
use tempfile::TempDir;

async fn table_exists(pool: &sqlx::SqlitePool, name: &str) -> bool {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table' AND name = ?")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap();
    row.get::<i64, _>("n") == 1
}

#[tokio::test]
async fn test_creates_database_and_parent_folders() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("folder").join("inquisitor.db");

    let pool = init_database(&db_path).await.unwrap();
    assert!(db_path.exists());
    assert!(table_exists(&pool, "asset_records").await);
}

#[tokio::test]
async fn test_reopen_keeps_records() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("inquisitor.db");

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query(
        "INSERT INTO asset_records (collection, key, data, created_at, updated_at) VALUES ('hosts', 'example.com', '{}', 'now', 'now')",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;

    let pool = init_database(&db_path).await.unwrap();
    let row = sqlx::query("SELECT COUNT(*) AS n FROM asset_records")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.get::<i64, _>("n"), 1);
}

#[tokio::test]
async fn test_one_record_per_collection_key() {
    let pool = init_memory_database().await.unwrap();
    let insert = "INSERT INTO asset_records (collection, key, data, created_at, updated_at) VALUES (?, 'example.com', '{}', 'now', 'now')";

    sqlx::query(insert).bind("hosts").execute(&pool).await.unwrap();
    sqlx::query(insert).bind("emails").execute(&pool).await.unwrap();
    assert!(sqlx::query(insert).bind("hosts").execute(&pool).await.is_err());
}

#[tokio::test]
async fn test_wal_journal_mode() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("inquisitor.db")).await.unwrap();

    let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}
