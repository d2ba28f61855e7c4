//! `dump` command: export the repository as JSON
//!
//! Output is an object keyed by repository name (`registrants`, `blocks`,
//! ...), each holding that kind's records with an added `owned` field
//! (inferred ownership). Owned records come first. Explicitly rejected
//! records are left out unless `all` is set.

use crate::assets::Ownership;
use crate::error::InqResult;
use crate::ownership::is_owned;
use crate::repository::IntelligenceRepository;
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::Write;
use std::path::Path;

/// Build the dump document
pub async fn dump(repo: &IntelligenceRepository, all: bool) -> InqResult<Value> {
    let mut document = Map::new();

    for spec in repo.registry().iter() {
        let mut owned_records = Vec::new();
        let mut other_records = Vec::new();

        for asset in repo.assets_of_kind(spec.kind).await? {
            if !all && asset.ownership() == Ownership::Rejected {
                continue;
            }
            let owned = is_owned(&asset, repo).await?;
            let mut record = asset.to_data()?;
            if let Value::Object(fields) = &mut record {
                fields.insert("owned".to_string(), Value::Bool(owned));
            }
            if owned {
                owned_records.push(record);
            } else {
                other_records.push(record);
            }
        }

        owned_records.extend(other_records);
        document.insert(spec.repository.to_string(), Value::Array(owned_records));
    }

    Ok(Value::Object(document))
}

/// Pretty-print with four-space indentation; object keys come out sorted
pub fn write_json(value: &Value, mut out: impl Write) -> InqResult<()> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Write the dump to `path`, or to stdout when no path is given
pub async fn dump_to(repo: &IntelligenceRepository, path: Option<&Path>, all: bool) -> InqResult<()> {
    let document = dump(repo, all).await?;
    match path {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            write_json(&document, std::io::BufWriter::new(file))?;
            tracing::info!(path = %path.display(), "Wrote dump");
        }
        None => write_json(&document, std::io::stdout().lock())?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{Asset, AssetRegistry, Host};
    use crate::lookup::OfflineLookup;
    use inq_common::db::init_memory_database;
    use std::sync::Arc;

    async fn seeded() -> IntelligenceRepository {
        let pool = init_memory_database().await.unwrap();
        let repo = IntelligenceRepository::new(pool, AssetRegistry::standard(), Arc::new(OfflineLookup));

        repo.put(&Asset::from(Host::new("b.example.org").unwrap()), false).await.unwrap();
        let mut accepted = Asset::from(Host::new("example.com").unwrap());
        accepted.set_ownership(Ownership::Accepted);
        repo.put(&accepted, true).await.unwrap();
        let mut rejected = Asset::from(Host::new("example.net").unwrap());
        rejected.set_ownership(Ownership::Rejected);
        repo.put(&rejected, true).await.unwrap();
        repo
    }

    fn hosts(document: &Value) -> Vec<(&str, bool)> {
        document["hosts"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| (r["host"].as_str().unwrap(), r["owned"].as_bool().unwrap()))
            .collect()
    }

    #[tokio::test]
    async fn test_dump_orders_owned_first_and_hides_rejected() {
        let repo = seeded().await;
        let document = dump(&repo, false).await.unwrap();

        assert_eq!(
            hosts(&document),
            vec![("example.com", true), ("b.example.org", false), ("example.org", false)]
        );
        let keys: Vec<&str> = document.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["blocks", "emails", "hosts", "linkedins", "registrants"]);
        assert_eq!(document["hosts"][0]["ownership"], "accepted");
    }

    #[tokio::test]
    async fn test_dump_all_includes_rejected() {
        let repo = seeded().await;
        let document = dump(&repo, true).await.unwrap();
        assert!(hosts(&document).contains(&("example.net", false)));
    }

    #[tokio::test]
    async fn test_dump_to_file() {
        let repo = seeded().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.json");

        dump_to(&repo, Some(&path), false).await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("{\n    \"blocks\": []"));
        let parsed: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, dump(&repo, false).await.unwrap());
    }
}
