//! Transaction batching and result fan-out.
//!
//! Every batched call becomes a pending message in the batcher's queue and
//! hands its caller a [`TxCall`]. Pending messages are coalesced
//! into one signed transaction and the chain's combined result is split back
//! into per-call results by content, not position.
//!
//! # When batches are sent
//!
//! - Outside a transaction scope, calls issued back to back form an implicit
//!   batch that is sent the first time any of their handles is awaited, or on
//!   [`Bluzelle::flush`](super::Bluzelle::flush).
//! - Inside [`Bluzelle::with_transaction`](super::Bluzelle::with_transaction)
//!   nothing is sent until the scope closes.
//! - With a message cap set, a full batch is sealed and a new one started;
//!   sealed batches are sent in order.
//!
//! Only one batch is in flight at a time, so account sequences never race and
//! batches reach the chain in the order they were sealed.

use std::collections::VecDeque;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future;
use tokio::sync::oneshot;

use crate::error::Error;
use crate::types::{Correlation, Fee, GasInfo, MatchedResponse, Msg};

use super::broadcast::Broadcaster;
use super::messages::Prepared;

type Reply = oneshot::Sender<Result<MatchedResponse, Error>>;
type ScopeWaiter = oneshot::Receiver<Result<(), Error>>;

/// A queued message waiting for its transaction.
pub(crate) struct PendingMessage {
    msg: Msg,
    gas: GasInfo,
    correlation: Correlation,
    reply: Reply,
}

/// Messages that will be signed together.
struct TransactionBatch {
    messages: Vec<PendingMessage>,
    /// Completion notifier for the transaction scope that sealed this batch.
    done: Option<oneshot::Sender<Result<(), Error>>>,
}

struct BatchState {
    pending: Vec<PendingMessage>,
    sealed: VecDeque<TransactionBatch>,
    scope_open: bool,
    scope_waiters: Vec<ScopeWaiter>,
    max_messages: usize,
}

impl BatchState {
    /// Move the pending messages into a sealed batch, if there are any.
    fn seal_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let messages = std::mem::take(&mut self.pending);
        let done = if self.scope_open {
            let (tx, rx) = oneshot::channel();
            self.scope_waiters.push(rx);
            Some(tx)
        } else {
            None
        };
        tracing::trace!(messages = messages.len(), scoped = done.is_some(), "sealed batch");
        self.sealed.push_back(TransactionBatch { messages, done });
    }

    /// The next batch that may be sent now.
    fn next_ready(&mut self) -> Option<TransactionBatch> {
        if self.sealed.is_empty() && !self.scope_open {
            self.seal_pending();
        }
        self.sealed.pop_front()
    }
}

/// Collects messages into transactions and resolves their callers.
pub(crate) struct Batcher {
    broadcaster: Arc<dyn Broadcaster>,
    state: Mutex<BatchState>,
    flush_lock: tokio::sync::Mutex<()>,
}

impl Batcher {
    pub(crate) fn new(broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self {
            broadcaster,
            state: Mutex::new(BatchState {
                pending: Vec::new(),
                sealed: VecDeque::new(),
                scope_open: false,
                scope_waiters: Vec::new(),
                max_messages: usize::MAX,
            }),
            flush_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cap the number of messages per transaction. Values below 1 become 1.
    pub(crate) fn set_max_messages(&self, max: usize) {
        self.lock().max_messages = max.max(1);
    }

    /// Append a message to the collecting batch.
    pub(crate) fn enqueue(
        &self,
        prepared: Prepared,
        gas: GasInfo,
    ) -> oneshot::Receiver<Result<MatchedResponse, Error>> {
        let (reply, receiver) = oneshot::channel();
        let mut state = self.lock();
        if state.pending.len() >= state.max_messages {
            state.seal_pending();
        }
        tracing::trace!(kind = prepared.msg.type_tag(), "queued message");
        state.pending.push(PendingMessage {
            msg: prepared.msg,
            gas,
            correlation: prepared.correlation,
            reply,
        });
        receiver
    }

    /// Send every batch that is ready, one at a time, in order.
    pub(crate) async fn flush(&self) {
        let _guard = self.flush_lock.lock().await;
        loop {
            let Some(batch) = self.lock().next_ready() else {
                break;
            };
            self.send(batch).await;
        }
    }

    async fn send(&self, batch: TransactionBatch) {
        let fee = Fee::combine(batch.messages.iter().map(|m| &m.gas));
        let mut msgs = Vec::with_capacity(batch.messages.len());
        let mut waiting = Vec::with_capacity(batch.messages.len());
        for message in batch.messages {
            msgs.push(message.msg);
            waiting.push((message.correlation, message.reply));
        }

        tracing::debug!(
            messages = msgs.len(),
            gas = fee.gas,
            fee = fee.amount,
            "flushing batch"
        );

        match self.broadcaster.submit(&msgs, fee).await {
            Ok(mut result) => {
                // Enqueue order decides ties between identical correlations
                for (correlation, reply) in waiting {
                    let _ = reply.send(Ok(result.take_match(&correlation)));
                }
                if let Some(done) = batch.done {
                    let _ = done.send(Ok(()));
                }
            }
            Err(e) => {
                tracing::warn!(messages = msgs.len(), error = %e, "batch failed");
                for (_, reply) in waiting {
                    let _ = reply.send(Err(e.clone()));
                }
                if let Some(done) = batch.done {
                    let _ = done.send(Err(e));
                }
            }
        }
    }

    // ─── Transaction scopes ───

    fn open_scope(&self) -> Result<(), Error> {
        let mut state = self.lock();
        if state.scope_open {
            return Err(Error::NestedTransactionNotAllowed);
        }
        // Earlier implicit calls keep their own transaction
        state.seal_pending();
        state.scope_open = true;
        Ok(())
    }

    fn close_scope(&self) -> Vec<ScopeWaiter> {
        let mut state = self.lock();
        state.seal_pending();
        state.scope_open = false;
        std::mem::take(&mut state.scope_waiters)
    }

    fn abandon_scope(&self) {
        let mut state = self.lock();
        let dropped = state.pending.len();
        state.pending.clear();
        state.scope_open = false;
        state.scope_waiters.clear();
        tracing::warn!(dropped, "transaction scope abandoned");
    }

    /// Run `f` inside a transaction scope.
    ///
    /// `f` runs synchronously before this returns, so a nested call made from
    /// inside `f` sees the open scope and fails. The returned future sends
    /// the scope's batches and resolves to `f`'s value once all of them
    /// settle, or to the first batch error.
    pub(crate) fn scoped<R, F>(
        self: &Arc<Self>,
        f: F,
    ) -> Pin<Box<dyn Future<Output = Result<R, Error>> + Send>>
    where
        R: Send + 'static,
        F: FnOnce() -> R,
    {
        let outcome = self.open_scope().map(|()| {
            let guard = ScopeGuard {
                batcher: self.as_ref(),
                closed: false,
            };
            let value = f();
            (value, guard.close())
        });

        let batcher = Arc::clone(self);
        Box::pin(async move {
            let (value, waiters) = outcome?;
            if waiters.is_empty() {
                return Ok(value);
            }

            batcher.flush().await;

            // First error in seal order
            let first_error = future::join_all(waiters)
                .await
                .into_iter()
                .find_map(|settled| settled.unwrap_or(Err(Error::BatchDropped)).err());
            match first_error {
                Some(e) => Err(e),
                None => Ok(value),
            }
        })
    }
}

/// Closes the scope if the closure unwinds.
struct ScopeGuard<'a> {
    batcher: &'a Batcher,
    closed: bool,
}

impl ScopeGuard<'_> {
    fn close(mut self) -> Vec<ScopeWaiter> {
        self.closed = true;
        self.batcher.close_scope()
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        if !self.closed {
            self.batcher.abandon_scope();
        }
    }
}

// ============================================================================
// TxCall
// ============================================================================

/// Handle to one batched call.
///
/// The call is queued when the method returns. Awaiting the handle sends any
/// batch that is ready (unless a transaction scope is still open) and then
/// waits for this call's own result.
///
/// A handle that is dropped without being awaited still has its message
/// sent with the next batch; only its result is discarded.
///
/// # Example
///
/// ```rust,no_run
/// # use bluzelle_kit::*;
/// # async fn example(bz: Bluzelle) -> Result<(), Error> {
/// // Both calls go out in one transaction
/// let a = bz.create("a", "1", Lease::ZERO);
/// let b = bz.tx_count();
/// a.await?;
/// let count = b.await?.count;
/// # Ok(())
/// # }
/// ```
#[must_use = "a TxCall does nothing visible unless awaited"]
pub struct TxCall<T> {
    queued: Result<Queued, Error>,
    convert: fn(MatchedResponse) -> Result<T, Error>,
}

struct Queued {
    batcher: Arc<Batcher>,
    receiver: oneshot::Receiver<Result<MatchedResponse, Error>>,
}

impl<T> TxCall<T> {
    /// Queue a validated message. Without a batcher the call fails with
    /// [`Error::NoSigner`].
    pub(crate) fn queue(
        batcher: Option<&Arc<Batcher>>,
        prepared: Result<Prepared, Error>,
        gas: GasInfo,
        convert: fn(MatchedResponse) -> Result<T, Error>,
    ) -> Self {
        let queued = prepared.and_then(|prepared| {
            let batcher = batcher.ok_or(Error::NoSigner)?;
            Ok(Queued {
                batcher: Arc::clone(batcher),
                receiver: batcher.enqueue(prepared, gas),
            })
        });
        Self { queued, convert }
    }
}

impl<T: Send + 'static> IntoFuture for TxCall<T> {
    type Output = Result<T, Error>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        let convert = self.convert;
        Box::pin(async move {
            let Queued { batcher, receiver } = self.queued?;
            batcher.flush().await;
            let matched = receiver.await.map_err(|_| Error::BatchDropped)??;
            convert(matched)
        })
    }
}

impl<T> std::fmt::Debug for TxCall<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxCall")
            .field("queued", &self.queued.is_ok())
            .finish()
    }
}
