//! Account sequence manager for transaction signing.
//!
//! Cosmos transactions are signed over the account number and the account's
//! current sequence. Fetching both before every transaction costs a round
//! trip, so they are cached in memory and the sequence is advanced locally.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Account number and sequence to sign a transaction with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountSequence {
    pub account_number: u64,
    pub sequence: u64,
}

struct CachedAccount {
    account_number: u64,
    /// Sequence the next transaction should use.
    next_sequence: AtomicU64,
}

/// Caches account numbers and sequences per address.
pub struct SequenceManager {
    accounts: Mutex<HashMap<String, CachedAccount>>,
}

impl Default for SequenceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceManager {
    /// Create a new sequence manager.
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
        }
    }

    /// Get the account number and sequence for the next transaction.
    ///
    /// Fetches from the chain on first use, then increments locally. The
    /// chain reports the sequence the next transaction must carry, so the
    /// first value handed out is the fetched one.
    pub async fn next<F, Fut>(
        &self,
        address: &str,
        fetch_from_chain: F,
    ) -> Result<AccountSequence, crate::Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccountSequence, crate::Error>>,
    {
        if let Some(cached) = self.take_cached(address) {
            return Ok(cached);
        }

        let fetched = fetch_from_chain().await?;
        tracing::debug!(
            address,
            account_number = fetched.account_number,
            sequence = fetched.sequence,
            "fetched account sequence"
        );

        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        // Another task may have fetched while we were waiting
        if let Some(cached) = accounts.get(address) {
            return Ok(AccountSequence {
                account_number: cached.account_number,
                sequence: cached.next_sequence.fetch_add(1, Ordering::SeqCst),
            });
        }
        accounts.insert(
            address.to_string(),
            CachedAccount {
                account_number: fetched.account_number,
                next_sequence: AtomicU64::new(fetched.sequence + 1),
            },
        );

        Ok(fetched)
    }

    fn take_cached(&self, address: &str) -> Option<AccountSequence> {
        let accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        accounts.get(address).map(|cached| AccountSequence {
            account_number: cached.account_number,
            sequence: cached.next_sequence.fetch_add(1, Ordering::SeqCst),
        })
    }

    /// Invalidate the cached sequence for an address.
    ///
    /// Call this when the chain rejects a transaction, since a rejected
    /// transaction does not consume its sequence.
    pub fn invalidate(&self, address: &str) {
        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        accounts.remove(address);
    }
}
