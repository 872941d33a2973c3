//! Quickstart - Essential Bluzelle operations
//!
//! Covers: queries, create/update/delete, batched transactions, leases
//!
//! Run: cargo run --example quickstart
//!
//! Environment variables:
//!   BLUZELLE_UUID=my-namespace            (required)
//!   BLUZELLE_ENDPOINT=http://localhost:1317
//!   BLUZELLE_ADDRESS=bluzelle1...         (for write operations)
//!   BLUZELLE_PRIVATE_KEY=<hex secret key> (for write operations)

use bluzelle_kit::*;

// ============================================================================
// 1. Read data (no credentials needed)
// ============================================================================

async fn query_example(bz: &Bluzelle) -> Result<(), Error> {
    println!("=== Query Example ===\n");

    println!("Node version: {}", bz.version().await?);
    println!("Namespace {} holds {} keys", bz.uuid(), bz.count().await?);

    for kv in bz.key_values().await? {
        println!("  {} = {}", kv.key, kv.value);
    }

    match bz.read("greeting").await {
        Ok(value) => println!("greeting = {value}"),
        Err(Error::KeyNotFound) => println!("greeting is not set yet"),
        Err(e) => return Err(e),
    }

    Ok(())
}

// ============================================================================
// 2. Single writes
// ============================================================================

async fn write_example(bz: &Bluzelle) -> Result<(), Error> {
    println!("\n=== Write Example ===\n");

    if bz.has("greeting").await? {
        bz.update("greeting", "hello again", Lease::ZERO).await?;
    } else {
        let tx = bz.create("greeting", "hello", Lease::hours(1)).await?;
        println!("Created in block {} ({})", tx.height, tx.txhash);
    }

    println!("Lease left: {}s", bz.get_lease("greeting").await?);
    Ok(())
}

// ============================================================================
// 3. Batched transactions
// ============================================================================

async fn batch_example(bz: &Bluzelle) -> Result<(), Error> {
    println!("\n=== Batch Example ===\n");

    // Everything inside the closure is signed and sent as one transaction
    let (count, keys) = bz
        .with_transaction(|bz| {
            for i in 1..=3 {
                let _ = bz.create(&format!("item{i}"), &format!("value{i}"), Lease::minutes(10));
            }
            (bz.tx_count(), bz.tx_keys())
        })
        .await?;

    println!("Keys after batch: {:?}", keys.await?.keys);
    println!("Count after batch: {}", count.await?.count);

    // Calls issued back to back also share a transaction
    let first = bz.delete("item1");
    let second = bz.delete("item2");
    let third = bz.delete("item3");
    first.await?;
    second.await?;
    third.await?;

    Ok(())
}

// ============================================================================
// 4. Leases
// ============================================================================

async fn lease_example(bz: &Bluzelle) -> Result<(), Error> {
    println!("\n=== Lease Example ===\n");

    bz.renew_lease("greeting", Lease::days(1).and_hours(12)).await?;

    for lease in bz.get_n_shortest_leases(5).await? {
        println!("  {} expires in {}s", lease.key, lease.lease);
    }

    println!("My keys: {:?}", bz.my_keys().await?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let bz = Bluzelle::from_env()?;

    query_example(&bz).await?;

    if bz.address().is_none() {
        println!("\nSet BLUZELLE_ADDRESS and BLUZELLE_PRIVATE_KEY to run write examples");
        return Ok(());
    }

    write_example(&bz).await?;
    batch_example(&bz).await?;
    lease_example(&bz).await?;

    Ok(())
}
