//! Error types for bluzelle-kit.
//!
//! # Error Hierarchy
//!
//! - [`Error`](enum@Error): Main error type, returned by every operation
//!   - [`ValidationError`]: Bad input caught before anything is queued
//!   - [`RpcError`]: Transport errors talking to the REST endpoint
//!
//! [`Error`] is `Clone`: when a batched transaction fails, every caller whose
//! message was part of that batch receives the same error.
//!
//! # Example
//!
//! ```rust,no_run
//! use bluzelle_kit::*;
//!
//! # async fn example(bz: Bluzelle) -> Result<(), Error> {
//! match bz.read("maybe-there").await {
//!     Ok(value) => println!("value: {}", value),
//!     Err(Error::KeyNotFound) => println!("no such key"),
//!     Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! ```

use thiserror::Error;

/// Input rejected before any message enters a batch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Key cannot be empty")]
    KeyCannotBeEmpty,

    #[error("Key cannot contain a slash")]
    KeyCannotContainSlash,

    #[error("Invalid lease time")]
    InvalidLeaseTime,
}

// ============================================================================
// RPC Errors
// ============================================================================

/// Transport-level errors talking to the chain's REST endpoint.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    // ─── Network/Transport ───
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {message}")]
    Network { message: String, retryable: bool },

    #[error("Timeout after {0} retries")]
    Timeout(u32),

    #[error("JSON parse error: {0}")]
    Json(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RpcError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcError::Http { status, .. } => is_retryable_status(*status),
            RpcError::Network { retryable, .. } => *retryable,
            RpcError::Timeout(_) => true,
            _ => false,
        }
    }

    /// Returns true if the endpoint answered 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RpcError::Http { status: 404, .. })
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>, retryable: bool) -> Self {
        RpcError::Network {
            message: message.into(),
            retryable,
        }
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return RpcError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            };
        }
        let retryable = err.is_timeout() || err.is_connect();
        RpcError::network(err.to_string(), retryable)
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        RpcError::Json(err.to_string())
    }
}

pub(crate) fn is_retryable_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..600).contains(&status)
}

// ============================================================================
// Main Error Type
// ============================================================================

/// Main error type for bluzelle-kit operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    // ─── Configuration ───
    #[error("No signer configured. Call .signer() or .credentials() on BluzelleBuilder.")]
    NoSigner,

    #[error("Invalid configuration: {0}")]
    Config(String),

    // ─── Validation ───
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // ─── Queries ───
    #[error("key not found")]
    KeyNotFound,

    // ─── RPC ───
    #[error(transparent)]
    Rpc(#[from] RpcError),

    // ─── Transaction ───
    #[error("Transaction rejected (code {code}): {raw_log}")]
    ChainRejected { code: u32, raw_log: String },

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Nested transactions are not allowed")]
    NestedTransactionNotAllowed,

    #[error("Batch was dropped before its result was delivered")]
    BatchDropped,

    // ─── Signing ───
    #[error("Signing failed: {0}")]
    Signing(String),
}

impl Error {
    /// Returns true if the chain rejected the transaction.
    pub fn is_chain_rejection(&self) -> bool {
        matches!(self, Error::ChainRejected { .. })
    }

    /// The chain's raw log, if this is a chain rejection.
    pub fn raw_log(&self) -> Option<&str> {
        match self {
            Error::ChainRejected { raw_log, .. } => Some(raw_log),
            _ => None,
        }
    }

    /// Returns true if the input was rejected before anything was sent.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Rpc(err.into())
    }
}
