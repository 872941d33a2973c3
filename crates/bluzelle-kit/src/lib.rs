//! A batching Rust client for the Bluzelle key-value store.
//!
//! **bluzelle-kit** stores keys and values in a namespace (a *uuid*) on a
//! Cosmos SDK chain. Every write is a signed transaction; to keep that cheap,
//! calls are collected into batches and sent as one multi-message
//! transaction, and the chain's combined answer is split back into one result
//! per call.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use bluzelle_kit::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), bluzelle_kit::Error> {
//!     let bz = Bluzelle::from_env()?;
//!
//!     bz.create("greeting", "hello", Lease::minutes(10)).await?;
//!     assert_eq!(bz.read("greeting").await?, "hello");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Batching
//!
//! Batched methods queue their message immediately and return a [`TxCall`].
//! Calls made back to back share a transaction that is sent when the first
//! of their handles is awaited:
//!
//! ```rust,no_run
//! # use bluzelle_kit::*;
//! # async fn example(bz: Bluzelle) -> Result<(), Error> {
//! let a = bz.create("a", "1", Lease::ZERO);
//! let b = bz.create("b", "2", Lease::ZERO);
//! let (a, b) = (a.await?, b.await?);
//! assert_eq!(a.txhash, b.txhash);
//! # Ok(())
//! # }
//! ```
//!
//! [`Bluzelle::with_transaction`] makes the grouping explicit, and
//! [`Bluzelle::set_max_messages_per_transaction`] splits large batches.
//!
//! # Core Types
//!
//! - [`Lease`] - Key lifetime, converted to blocks
//! - [`GasInfo`] - Per-call gas limit, fee and price
//! - [`Msg`] - A chain message as it is signed
//! - [`Correlation`] - How a message finds its entry in a combined result

pub mod client;
pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{Error, RpcError, ValidationError};
pub use types::*;

// Re-export client types
pub use client::{
    AccountInfo, AccountSequence, Bluzelle, BluzelleBuilder, BroadcastFuture, Broadcaster,
    DEFAULT_CHAIN_ID, DEFAULT_ENDPOINT, EnvSigner, InMemorySigner, QueryFuture, QueryService,
    ReadQuery, RestBroadcaster, RestClient, RetryConfig, SequenceManager, SignFuture, Signer,
    TransactionFuture, TxCall,
};
