//! Client module for the Bluzelle key-value store.
//!
//! This module provides the core client infrastructure:
//!
//! - [`Bluzelle`]: The main client, the single entry point for all operations
//! - [`BluzelleBuilder`]: Fluent builder for configuring the client
//! - [`TxCall`]: Handle to one batched call, resolved when its transaction settles
//! - [`RestClient`]: Low-level REST client with retry logic
//!
//! # Collaborators
//!
//! Batching talks to the chain only through two traits, so either side can be
//! replaced (for example by an in-memory chain in tests):
//!
//! | Trait | Default implementation |
//! |-------|------------------------|
//! | [`Broadcaster`] | [`RestBroadcaster`]: signs and posts to `/txs` |
//! | [`QueryService`] | [`RestClient`]: GETs the light-client query routes |
//!
//! # Signers
//!
//! | Signer | Use Case |
//! |--------|----------|
//! | [`InMemorySigner`] | Scripts with a hex secret key in memory |
//! | [`EnvSigner`] | CI via `BLUZELLE_ADDRESS` / `BLUZELLE_PRIVATE_KEY` env vars |

mod batcher;
mod bluzelle;
mod broadcast;
mod messages;
mod query;
mod rpc;
mod sequence_manager;
mod signer;

pub use batcher::TxCall;
pub use bluzelle::{Bluzelle, BluzelleBuilder, DEFAULT_CHAIN_ID, DEFAULT_ENDPOINT, TransactionFuture};
pub use broadcast::{BroadcastFuture, Broadcaster, RestBroadcaster};
pub use query::{AccountInfo, QueryFuture, QueryService, ReadQuery};
pub use rpc::{RestClient, RetryConfig};
pub use sequence_manager::{AccountSequence, SequenceManager};
pub use signer::{EnvSigner, InMemorySigner, SignFuture, Signer};
