//! Ownership inference and hierarchy integration tests

mod helpers;

use helpers::{acme_lookup, classified, memory_repository};
use inq_engine::assets::{Asset, AssetKind, Block, Host, Ownership, Registrant};
use inq_engine::hierarchy::{parent_asset, strictly_contains};
use inq_engine::lookup::OfflineLookup;
use inq_engine::ownership::{is_owned, owned_assets};
use ipnet::IpNet;

fn net(s: &str) -> IpNet {
    s.parse().unwrap()
}

#[test]
fn test_block_containment_candidates() {
    assert!(strictly_contains(&net("10.0.0.0/16"), &net("10.0.0.0/24")));
    assert!(!strictly_contains(&net("10.0.0.0/24"), &net("10.0.0.0/24")));
    assert!(!strictly_contains(&net("10.0.1.0/24"), &net("10.0.0.0/24")));
}

#[tokio::test]
async fn test_block_parent_resolution_uses_containment() {
    let repo = memory_repository(OfflineLookup).await;
    let wide = classified(Block::new("10.0.0.0/16").unwrap(), Ownership::Accepted);
    let sibling = classified(Block::new("10.0.1.0/24").unwrap(), Ownership::Accepted);
    let child = classified(Block::new("10.0.0.5/24").unwrap(), Ownership::Accepted);
    for asset in [&wide, &sibling, &child] {
        repo.put(asset, true).await.unwrap();
    }

    assert_eq!(child.key(), "10.0.0.0/24");
    assert_eq!(parent_asset(&child, &repo).await.unwrap(), Some(wide.clone()));
    assert_eq!(parent_asset(&sibling, &repo).await.unwrap(), Some(wide.clone()));
    assert_eq!(parent_asset(&wide, &repo).await.unwrap(), None);
}

#[tokio::test]
async fn test_host_ownership_falls_back_to_registrant() {
    let repo = memory_repository(acme_lookup()).await;

    let host = repo.get_or_create(AssetKind::Host, "www.acme.com").await.unwrap();
    repo.put(&host, false).await.unwrap();
    assert_eq!(host.ownership(), Ownership::Unknown);

    // Neither parent domain nor registrant owned
    assert!(!is_owned(&host, &repo).await.unwrap());

    let acme = classified(Registrant::new("Acme Corp").unwrap(), Ownership::Accepted);
    repo.put(&acme, true).await.unwrap();
    assert!(is_owned(&host, &repo).await.unwrap());

    // The block registered to the same organization follows along
    let block = repo.get_by_key(AssetKind::Block, "203.0.113.0/24").await.unwrap().unwrap();
    assert!(is_owned(&block, &repo).await.unwrap());

    let rejected = classified(Registrant::new("Acme Corp").unwrap(), Ownership::Rejected);
    repo.put(&rejected, true).await.unwrap();
    assert!(!is_owned(&host, &repo).await.unwrap());
}

#[tokio::test]
async fn test_explicit_rejection_overrides_inference() {
    let repo = memory_repository(OfflineLookup).await;
    repo.put(&classified(Host::new("acme.com").unwrap(), Ownership::Accepted), true)
        .await
        .unwrap();
    let www = classified(Host::new("www.acme.com").unwrap(), Ownership::Rejected);
    repo.put(&www, true).await.unwrap();
    let api = Asset::from(Host::new("api.acme.com").unwrap());
    repo.put(&api, false).await.unwrap();

    assert!(!is_owned(&www, &repo).await.unwrap());
    assert!(is_owned(&api, &repo).await.unwrap());

    let owned: Vec<String> = owned_assets(&repo)
        .await
        .unwrap()
        .iter()
        .map(|a| a.key().to_string())
        .collect();
    assert_eq!(owned, vec!["acme.com", "api.acme.com"]);
}

#[tokio::test]
async fn test_host_hierarchy_prefers_domain_then_block_then_registrant() {
    let repo = memory_repository(acme_lookup()).await;
    let host = repo.get_or_create(AssetKind::Host, "www.acme.com").await.unwrap();
    repo.put(&host, false).await.unwrap();

    let acme = classified(Registrant::new("Acme Corp").unwrap(), Ownership::Accepted);
    repo.put(&acme, true).await.unwrap();

    // acme.com is owned through its registrant
    let domain = repo.get_by_key(AssetKind::Host, "acme.com").await.unwrap().unwrap();
    assert_eq!(parent_asset(&host, &repo).await.unwrap(), Some(domain.clone()));

    // Without an owned parent domain, the owned block holding the address wins
    repo.put(&classified(domain, Ownership::Rejected), true).await.unwrap();
    let block = repo.get_by_key(AssetKind::Block, "203.0.113.0/24").await.unwrap().unwrap();
    assert_eq!(parent_asset(&host, &repo).await.unwrap(), Some(block.clone()));
    assert_eq!(parent_asset(&block, &repo).await.unwrap(), Some(acme.clone()));

    // Without an owned block, the registrant
    repo.put(&classified(block, Ownership::Rejected), true).await.unwrap();
    assert_eq!(parent_asset(&host, &repo).await.unwrap(), Some(acme));
}

#[tokio::test]
async fn test_cyclic_parent_chain_terminates() {
    let repo = memory_repository(OfflineLookup).await;
    repo.put(&classified(Host::new("example.com").unwrap(), Ownership::Accepted), true)
        .await
        .unwrap();

    // Hand-built records whose parents point at each other
    let mut a = Host::new("a.example.com").unwrap();
    a.parent = Some("b.example.com".to_string());
    let mut b = Host::new("b.example.com").unwrap();
    b.parent = Some("a.example.com".to_string());
    let a = Asset::from(a);
    repo.put(&a, true).await.unwrap();
    repo.put(&Asset::from(b), true).await.unwrap();

    let stored = repo.get_by_key(AssetKind::Host, "b.example.com").await.unwrap().unwrap();
    assert_eq!(stored.ownership(), Ownership::Unknown);
    assert!(!is_owned(&a, &repo).await.unwrap());
    assert!(!is_owned(&stored, &repo).await.unwrap());
}

#[tokio::test]
async fn test_inference_stops_at_depth_ceiling() {
    let repo = memory_repository(OfflineLookup).await;
    repo.put(&classified(Host::new("example.com").unwrap(), Ownership::Accepted), true)
        .await
        .unwrap();

    let labels = |n: usize| vec!["x"; n].join(".");

    let shallow = Asset::from(Host::new(&format!("{}.example.com", labels(8))).unwrap());
    repo.put(&shallow, false).await.unwrap();
    assert!(is_owned(&shallow, &repo).await.unwrap());

    // More hops than MAX_INFERENCE_DEPTH between the host and its owned domain
    let deep = Asset::from(Host::new(&format!("{}.example.com", labels(70))).unwrap());
    repo.put(&deep, false).await.unwrap();
    assert!(!is_owned(&deep, &repo).await.unwrap());
}
