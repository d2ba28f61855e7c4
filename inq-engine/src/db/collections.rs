//! Document collections
//!
//! The repository sees storage as one collection per asset kind with four
//! operations: filter, all, store, update. `SqliteCollection` implements
//! that over the shared `asset_records` table, one `collection` value per
//! kind. Records carry their canonical key in a dedicated column so point
//! lookups do not deserialize the whole collection.

use crate::utils::retry_on_lock;
use async_trait::async_trait;
use chrono::Utc;
use inq_common::{Error, Result};
use serde_json::Value;
use sqlx::{Row, SqlitePool};

/// Lock wait ceiling for store/update retries
const MAX_LOCK_WAIT_MS: u64 = 5000;

/// A stored document
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: i64,
    pub key: String,
    pub data: Value,
}

pub type RecordPredicate<'a> = dyn Fn(&StoredRecord) -> bool + Send + Sync + 'a;

#[async_trait]
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    /// Point lookup by canonical key
    async fn find(&self, key: &str) -> Result<Option<StoredRecord>>;

    /// Every record, in insertion order
    async fn all(&self) -> Result<Vec<StoredRecord>>;

    /// Records matching `predicate`, in insertion order
    async fn filter(&self, predicate: &RecordPredicate<'_>) -> Result<Vec<StoredRecord>> {
        Ok(self
            .all()
            .await?
            .into_iter()
            .filter(|r| predicate(r))
            .collect())
    }

    /// Insert a new record, returning its id
    async fn store(&self, key: &str, data: &Value) -> Result<i64>;

    /// Replace the data of an existing record
    async fn update(&self, id: i64, data: &Value) -> Result<()>;
}

/// Collection backed by the `asset_records` table
#[derive(Debug, Clone)]
pub struct SqliteCollection {
    pool: SqlitePool,
    name: String,
}

impl SqliteCollection {
    pub fn new(pool: SqlitePool, name: impl Into<String>) -> Self {
        Self {
            pool,
            name: name.into(),
        }
    }

    fn to_record(row: &sqlx::sqlite::SqliteRow) -> Result<StoredRecord> {
        let data: String = row.try_get("data")?;
        Ok(StoredRecord {
            id: row.try_get("id")?,
            key: row.try_get("key")?,
            data: serde_json::from_str(&data)?,
        })
    }

    /// Number of records in this collection
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM asset_records WHERE collection = ?")
            .bind(&self.name)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl Collection for SqliteCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(&self, key: &str) -> Result<Option<StoredRecord>> {
        let row = sqlx::query("SELECT id, key, data FROM asset_records WHERE collection = ? AND key = ?")
            .bind(&self.name)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::to_record).transpose()
    }

    async fn all(&self) -> Result<Vec<StoredRecord>> {
        let rows = sqlx::query("SELECT id, key, data FROM asset_records WHERE collection = ? ORDER BY id")
            .bind(&self.name)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::to_record).collect()
    }

    async fn store(&self, key: &str, data: &Value) -> Result<i64> {
        let data = serde_json::to_string(data)?;
        let now = Utc::now().to_rfc3339();

        retry_on_lock("store record", MAX_LOCK_WAIT_MS, || async {
            let result = sqlx::query(
                r#"
                INSERT INTO asset_records (collection, key, data, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&self.name)
            .bind(key)
            .bind(&data)
            .bind(&now)
            .bind(&now)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

            Ok(result.last_insert_rowid())
        })
        .await
    }

    async fn update(&self, id: i64, data: &Value) -> Result<()> {
        let data = serde_json::to_string(data)?;
        let now = Utc::now().to_rfc3339();

        let rows = retry_on_lock("update record", MAX_LOCK_WAIT_MS, || async {
            let result = sqlx::query(
                "UPDATE asset_records SET data = ?, updated_at = ? WHERE id = ? AND collection = ?",
            )
            .bind(&data)
            .bind(&now)
            .bind(id)
            .bind(&self.name)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

            Ok(result.rows_affected())
        })
        .await?;

        if rows == 0 {
            return Err(Error::NotFound(format!("{} record {}", self.name, id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inq_common::db::init_memory_database;
    use serde_json::json;

    async fn hosts() -> SqliteCollection {
        let pool = init_memory_database().await.unwrap();
        SqliteCollection::new(pool, "hosts")
    }

    #[tokio::test]
    async fn test_store_and_find() {
        let hosts = hosts().await;
        let id = hosts.store("example.com", &json!({"host": "example.com"})).await.unwrap();

        let found = hosts.find("example.com").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.data["host"], "example.com");
        assert!(hosts.find("other.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_key_is_rejected_by_storage() {
        let hosts = hosts().await;
        hosts.store("example.com", &json!({})).await.unwrap();
        assert!(hosts.store("example.com", &json!({})).await.is_err());
        assert_eq!(hosts.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let pool = init_memory_database().await.unwrap();
        let hosts = SqliteCollection::new(pool.clone(), "hosts");
        let blocks = SqliteCollection::new(pool, "blocks");

        hosts.store("k", &json!({"a": 1})).await.unwrap();
        blocks.store("k", &json!({"b": 2})).await.unwrap();

        assert_eq!(hosts.all().await.unwrap().len(), 1);
        assert_eq!(blocks.find("k").await.unwrap().unwrap().data, json!({"b": 2}));
    }

    #[tokio::test]
    async fn test_update_and_filter() {
        let hosts = hosts().await;
        let a = hosts.store("a.example.com", &json!({"n": 1})).await.unwrap();
        hosts.store("b.example.com", &json!({"n": 2})).await.unwrap();

        hosts.update(a, &json!({"n": 3})).await.unwrap();

        let big = hosts.filter(&|r: &StoredRecord| r.data["n"].as_i64() > Some(2)).await.unwrap();
        assert_eq!(big.len(), 1);
        assert_eq!(big[0].key, "a.example.com");

        let keys: Vec<_> = hosts.all().await.unwrap().into_iter().map(|r| r.key).collect();
        assert_eq!(keys, vec!["a.example.com", "b.example.com"]);
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let hosts = hosts().await;
        let err = hosts.update(42, &json!({})).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
