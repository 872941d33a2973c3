//! Integration tests for leases and key ownership.
//!
//! These run with tokio's clock paused; the fake chain derives its block
//! height from tokio time, so `advance` moves the chain forward.

use std::time::Duration;

use bluzelle_kit::*;
use tokio::time::advance;

use crate::fake_chain::FakeChain;
use crate::init_tracing;

const OWNER: &str = "bluzelle1leaseholder";
const OTHER: &str = "bluzelle1someoneelse";

fn setup(uuid: &str) -> (FakeChain, Bluzelle) {
    init_tracing();
    let chain = FakeChain::new();
    let bz = chain.client(uuid, OWNER);
    (chain, bz)
}

// =============================================================================
// Lease reporting
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_get_lease_reports_seconds() {
    let (_chain, bz) = setup("lease-get");

    bz.create("k", "v", Lease::minutes(10)).await.unwrap();

    assert_eq!(bz.get_lease("k").await.unwrap(), 600);
    assert_eq!(bz.tx_get_lease("k").await.unwrap().lease, 600);

    advance(Duration::from_secs(60)).await;
    assert_eq!(bz.get_lease("k").await.unwrap(), 540);
}

#[tokio::test(start_paused = true)]
async fn test_partial_blocks_round_up() {
    let (_chain, bz) = setup("lease-round");

    bz.create("k", "v", Lease::seconds(7)).await.unwrap();
    assert_eq!(bz.get_lease("k").await.unwrap(), 10);
}

#[tokio::test(start_paused = true)]
async fn test_get_n_shortest_leases() {
    let (chain, bz) = setup("lease-shortest");

    bz.with_transaction(|bz| {
        let _ = bz.create("long", "v", Lease::hours(1));
        let _ = bz.create("short", "v", Lease::minutes(1));
        let _ = bz.create("medium", "v", Lease::minutes(2).and_seconds(30));
    })
    .await
    .unwrap();

    let leases = bz.get_n_shortest_leases(2).await.unwrap();
    assert_eq!(
        leases,
        vec![
            KeyLease {
                key: "short".to_string(),
                lease: 60
            },
            KeyLease {
                key: "medium".to_string(),
                lease: 150
            },
        ]
    );

    let in_tx = bz.tx_get_n_shortest_leases(1).await.unwrap();
    assert_eq!(in_tx.leases[0].key, "short");
    assert_eq!(chain.batch_sizes(), vec![3, 1]);
}

// =============================================================================
// Expiry and renewal
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_expired_keys_disappear() {
    let (_chain, bz) = setup("lease-expire");

    bz.with_transaction(|bz| {
        let _ = bz.create("brief", "v", Lease::seconds(10));
        let _ = bz.create("lasting", "v", Lease::days(1));
    })
    .await
    .unwrap();
    assert_eq!(bz.count().await.unwrap(), 2);
    assert_eq!(bz.my_keys().await.unwrap(), vec!["brief", "lasting"]);

    advance(Duration::from_secs(15)).await;

    assert!(!bz.has("brief").await.unwrap());
    assert_eq!(bz.read("brief").await.unwrap_err(), Error::KeyNotFound);
    assert_eq!(bz.my_keys().await.unwrap(), vec!["lasting".to_string()]);
    assert_eq!(bz.count().await.unwrap(), 1);

    // An expired key can be created again
    bz.create("brief", "again", Lease::ZERO).await.unwrap();
    assert_eq!(bz.read("brief").await.unwrap(), "again");
}

#[tokio::test(start_paused = true)]
async fn test_renew_lease_extends_expiry() {
    let (_chain, bz) = setup("lease-renew");

    bz.create("k", "v", Lease::seconds(10)).await.unwrap();
    bz.renew_lease("k", Lease::hours(1)).await.unwrap();
    assert_eq!(bz.get_lease("k").await.unwrap(), 3600);

    advance(Duration::from_secs(15)).await;
    assert_eq!(bz.read("k").await.unwrap(), "v");
}

#[tokio::test(start_paused = true)]
async fn test_renew_lease_all() {
    let (_chain, bz) = setup("lease-renew-all");

    bz.with_transaction(|bz| {
        let _ = bz.create("a", "1", Lease::seconds(10));
        let _ = bz.create("b", "2", Lease::minutes(1));
    })
    .await
    .unwrap();

    bz.renew_lease_all(Lease::minutes(5)).await.unwrap();
    assert_eq!(bz.get_lease("a").await.unwrap(), 300);
    assert_eq!(bz.get_lease("b").await.unwrap(), 300);
}

// =============================================================================
// Ownership
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_my_keys_excludes_deleted_and_foreign_keys() {
    let (chain, bz) = setup("lease-mine");
    let other = chain.client("lease-mine", OTHER);

    bz.with_transaction(|bz| {
        for key in ["a", "b", "c"] {
            let _ = bz.create(key, "v", Lease::ZERO);
        }
    })
    .await
    .unwrap();
    other.create("theirs", "v", Lease::ZERO).await.unwrap();
    bz.delete("b").await.unwrap();

    assert_eq!(bz.my_keys().await.unwrap(), vec!["a", "c"]);
    assert_eq!(other.my_keys().await.unwrap(), vec!["theirs"]);
    assert_eq!(bz.keys().await.unwrap(), vec!["a", "c", "theirs"]);
}
