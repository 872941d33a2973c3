//! Integration tests for single operations and plain queries.

use bluzelle_kit::*;

use crate::fake_chain::FakeChain;
use crate::init_tracing;

const OWNER: &str = "bluzelle1owner";
const OTHER: &str = "bluzelle1other";

fn setup(uuid: &str) -> (FakeChain, Bluzelle) {
    init_tracing();
    let chain = FakeChain::new();
    let bz = chain.client(uuid, OWNER);
    (chain, bz)
}

// =============================================================================
// Create / Read
// =============================================================================

#[tokio::test]
async fn test_create_then_read() {
    let (_chain, bz) = setup("crud-create");

    let tx = bz
        .create("greeting", "hello world", Lease::ZERO)
        .await
        .unwrap();
    assert!(tx.height >= 1);
    assert_eq!(tx.txhash.len(), 64);

    assert_eq!(bz.read("greeting").await.unwrap(), "hello world");
    assert_eq!(bz.read("greeting").prove().await.unwrap(), "hello world");
    assert!(bz.has("greeting").await.unwrap());
    assert_eq!(bz.count().await.unwrap(), 1);
    assert_eq!(bz.keys().await.unwrap(), vec!["greeting".to_string()]);
}

#[tokio::test]
async fn test_read_missing_key() {
    let (_chain, bz) = setup("crud-missing");

    assert_eq!(bz.read("nope").await.unwrap_err(), Error::KeyNotFound);
    assert_eq!(bz.read("nope").prove().await.unwrap_err(), Error::KeyNotFound);
    assert_eq!(bz.get_lease("nope").await.unwrap_err(), Error::KeyNotFound);
    assert!(!bz.has("nope").await.unwrap());
    assert_eq!(bz.count().await.unwrap(), 0);
    assert!(bz.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_existing_key_fails_and_keeps_value() {
    let (_chain, bz) = setup("crud-dup");

    bz.create("a", "first", Lease::ZERO).await.unwrap();
    let err = bz.create("a", "second", Lease::ZERO).await.unwrap_err();

    assert!(err.is_chain_rejection(), "expected rejection, got {err:?}");
    assert!(err.raw_log().unwrap().contains("already exists"));
    assert_eq!(bz.read("a").await.unwrap(), "first");
}

#[tokio::test]
async fn test_special_characters_round_trip() {
    let (_chain, bz) = setup("crud-escape");

    let key = "my key?#&";
    let value = "a/b c%d\"quoted\"";
    bz.create(key, value, Lease::ZERO).await.unwrap();

    assert_eq!(bz.read(key).await.unwrap(), value);
    assert_eq!(bz.keys().await.unwrap(), vec![key.to_string()]);
    assert_eq!(
        bz.key_values().await.unwrap(),
        vec![KeyValue::new(key, value)]
    );
    assert_eq!(bz.tx_read(key).await.unwrap().value, value);
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_invalid_input_never_reaches_chain() {
    let (chain, bz) = setup("crud-invalid");

    assert_eq!(
        bz.create("", "v", Lease::ZERO).await.unwrap_err(),
        Error::Validation(ValidationError::KeyCannotBeEmpty)
    );
    assert_eq!(
        bz.update("a/b", "v", Lease::ZERO).await.unwrap_err(),
        Error::Validation(ValidationError::KeyCannotContainSlash)
    );
    assert_eq!(
        bz.create("k", "v", Lease::seconds(-10)).await.unwrap_err(),
        Error::Validation(ValidationError::InvalidLeaseTime)
    );
    assert_eq!(
        bz.renew_lease_all(Lease::minutes(-1)).await.unwrap_err(),
        Error::Validation(ValidationError::InvalidLeaseTime)
    );
    let err = bz
        .multi_update(&[KeyValue::new("ok", "1"), KeyValue::new("bad/key", "2")])
        .await
        .unwrap_err();
    assert!(err.is_validation());

    assert!(chain.batch_sizes().is_empty());
}

// =============================================================================
// Update / Delete
// =============================================================================

#[tokio::test]
async fn test_update_and_delete() {
    let (_chain, bz) = setup("crud-update");

    let err = bz.update("k", "v", Lease::ZERO).await.unwrap_err();
    assert!(err.raw_log().unwrap().contains("key not found"));

    bz.create("k", "v1", Lease::ZERO).await.unwrap();
    bz.update("k", "v2", Lease::ZERO).await.unwrap();
    assert_eq!(bz.read("k").await.unwrap(), "v2");

    bz.delete("k").await.unwrap();
    assert_eq!(bz.read("k").await.unwrap_err(), Error::KeyNotFound);
    assert!(!bz.has("k").await.unwrap());
}

#[tokio::test]
async fn test_other_owner_cannot_touch_key() {
    let (chain, bz) = setup("crud-owner");
    let intruder = chain.client("crud-owner", OTHER);

    bz.create("mine", "v", Lease::ZERO).await.unwrap();

    let err = intruder.update("mine", "stolen", Lease::ZERO).await.unwrap_err();
    assert_eq!(err.raw_log(), Some("Incorrect Owner"));
    assert!(intruder.delete("mine").await.is_err());
    assert_eq!(bz.read("mine").await.unwrap(), "v");
}

#[tokio::test]
async fn test_multi_update_and_key_values() {
    let (_chain, bz) = setup("crud-multi");

    bz.with_transaction(|bz| {
        let _ = bz.create("a", "1", Lease::ZERO);
        let _ = bz.create("b", "2", Lease::ZERO);
    })
    .await
    .unwrap();

    bz.multi_update(&[KeyValue::new("a", "one"), KeyValue::new("b", "two")])
        .await
        .unwrap();

    assert_eq!(
        bz.key_values().await.unwrap(),
        vec![KeyValue::new("a", "one"), KeyValue::new("b", "two")]
    );

    // A missing key fails the whole update
    let err = bz
        .multi_update(&[KeyValue::new("a", "uno"), KeyValue::new("zzz", "x")])
        .await
        .unwrap_err();
    assert!(err.is_chain_rejection());
    assert_eq!(bz.read("a").await.unwrap(), "one");
}

#[tokio::test]
async fn test_delete_all_only_clears_own_namespace() {
    let (chain, bz) = setup("crud-delall");
    let neighbour = chain.client("crud-delall-other", OWNER);

    bz.create("a", "1", Lease::ZERO).await.unwrap();
    bz.create("b", "2", Lease::ZERO).await.unwrap();
    neighbour.create("c", "3", Lease::ZERO).await.unwrap();

    bz.delete_all().await.unwrap();

    assert_eq!(bz.count().await.unwrap(), 0);
    assert_eq!(neighbour.count().await.unwrap(), 1);
}

// =============================================================================
// Accounts and node info
// =============================================================================

#[tokio::test]
async fn test_transfer_tokens() {
    let (chain, bz) = setup("crud-transfer");
    chain.fund(OWNER, 10_000_000);

    bz.transfer_tokens_to(OTHER, 3).await.unwrap();

    let mine = bz.account().await.unwrap();
    assert_eq!(mine.address, OWNER);
    assert_eq!(mine.coins[0].amount, "7000000");
    assert_eq!(mine.coins[0].denom, "ubnt");
    assert_eq!(mine.account_number, 7);

    let theirs = chain.client("crud-transfer", OTHER).account().await.unwrap();
    assert_eq!(theirs.coins[0].amount, "3000000");

    let err = bz.transfer_tokens_to(OTHER, 100).await.unwrap_err();
    assert_eq!(err.raw_log(), Some("insufficient funds"));
}

#[tokio::test]
async fn test_unknown_account() {
    let (_chain, bz) = setup("crud-account");
    let err = bz.account().await.unwrap_err();
    assert!(matches!(err, Error::Rpc(ref rpc) if rpc.is_not_found()));
}

#[tokio::test]
async fn test_version() {
    let (_chain, bz) = setup("crud-version");
    assert_eq!(bz.version().await.unwrap(), "0.0.0-fake");
}

// =============================================================================
// Read-only clients
// =============================================================================

#[tokio::test]
async fn test_read_only_client_queries_but_cannot_write() {
    let (chain, bz) = setup("crud-readonly");
    bz.create("k", "v", Lease::ZERO).await.unwrap();

    let reader = chain.read_only_client("crud-readonly");
    assert_eq!(reader.address(), None);
    assert_eq!(reader.read("k").await.unwrap(), "v");
    assert_eq!(reader.count().await.unwrap(), 1);

    assert_eq!(
        reader.create("k2", "v", Lease::ZERO).await.unwrap_err(),
        Error::NoSigner
    );
    assert_eq!(reader.my_keys().await.unwrap_err(), Error::NoSigner);
    assert_eq!(chain.batch_sizes(), vec![1]);
}
