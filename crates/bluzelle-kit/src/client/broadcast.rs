//! Transaction signing and broadcasting.
//!
//! [`Broadcaster`] is the seam between the batcher and the chain: it takes the
//! messages of one batch plus their combined fee and returns the chain's
//! result. [`RestBroadcaster`] is the implementation that signs amino-JSON
//! transactions and posts them to a light-client daemon.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Deserialize;
use serde_json::{Value, json};
use serde_with::{DisplayFromStr, PickFirst, serde_as};

use crate::error::{Error, RpcError};
use crate::types::{ChainTxResult, DENOM, Fee, Msg};

use super::query::AccountInfo;
use super::rpc::RestClient;
use super::sequence_manager::{AccountSequence, SequenceManager};
use super::signer::Signer;

/// Maximum number of retries after a stale account sequence.
const MAX_SEQUENCE_RETRIES: u32 = 3;

const PUB_KEY_TYPE: &str = "tendermint/PubKeySecp256k1";

/// Future returned by [`Broadcaster::submit`].
pub type BroadcastFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ChainTxResult, Error>> + Send + 'a>>;

// ============================================================================
// Broadcaster Trait
// ============================================================================

/// Signs and submits one multi-message transaction.
///
/// Implementations must either return the chain's result for the whole
/// transaction or fail the whole transaction; there is no partial success.
pub trait Broadcaster: Send + Sync {
    fn submit<'a>(&'a self, msgs: &'a [Msg], fee: Fee) -> BroadcastFuture<'a>;
}

// ============================================================================
// RestBroadcaster
// ============================================================================

/// Broadcasts amino-JSON transactions through a REST endpoint.
pub struct RestBroadcaster {
    rest: Arc<RestClient>,
    signer: Arc<dyn Signer>,
    chain_id: String,
    memo: String,
    sequences: SequenceManager,
}

impl RestBroadcaster {
    pub fn new(rest: Arc<RestClient>, signer: Arc<dyn Signer>, chain_id: impl Into<String>) -> Self {
        Self {
            rest,
            signer,
            chain_id: chain_id.into(),
            memo: String::new(),
            sequences: SequenceManager::new(),
        }
    }

    /// Set the memo attached to every transaction.
    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    async fn fetch_account(&self) -> Result<AccountSequence, Error> {
        let path = format!("auth/accounts/{}", self.signer.address());
        let info = AccountInfo::from_result(self.rest.get_result(&path).await?)?;
        Ok(AccountSequence {
            account_number: info.account_number,
            sequence: info.sequence,
        })
    }

    async fn broadcast_once(&self, msgs: &[Msg], fee: Fee) -> Result<ChainTxResult, Error> {
        let address = self.signer.address();
        let account = self
            .sequences
            .next(address, || self.fetch_account())
            .await?;

        let fee_json = fee_json(fee);
        let msgs_json = serde_json::to_value(msgs)?;
        let doc = sign_doc(&self.chain_id, account, &fee_json, &self.memo, &msgs_json);
        let sign_bytes = sign_bytes(&doc)?;
        let signature = self.signer.sign(&sign_bytes).await?;

        let body = json!({
            "tx": {
                "msg": msgs_json,
                "fee": fee_json,
                "signatures": [{
                    "pub_key": {
                        "type": PUB_KEY_TYPE,
                        "value": STANDARD.encode(self.signer.public_key()),
                    },
                    "signature": STANDARD.encode(&signature),
                }],
                "memo": self.memo,
            },
            "mode": "block",
        });

        tracing::debug!(
            msgs = msgs.len(),
            gas = fee.gas,
            fee = fee.amount,
            sequence = account.sequence,
            "broadcasting transaction"
        );

        let response: BroadcastResponse = self.rest.post("txs", &body).await?;
        response.into_result()
    }
}

impl Broadcaster for RestBroadcaster {
    fn submit<'a>(&'a self, msgs: &'a [Msg], fee: Fee) -> BroadcastFuture<'a> {
        Box::pin(async move {
            let mut attempt = 0;
            loop {
                match self.broadcast_once(msgs, fee).await {
                    Ok(result) => {
                        tracing::debug!(
                            txhash = %result.txhash,
                            height = result.height,
                            entries = result.data.len(),
                            "transaction committed"
                        );
                        return Ok(result);
                    }
                    Err(e) => {
                        // A failed transaction does not consume its sequence
                        self.sequences.invalidate(self.signer.address());

                        if is_sequence_mismatch(&e) && attempt < MAX_SEQUENCE_RETRIES {
                            attempt += 1;
                            tracing::warn!(attempt, error = %e, "stale account sequence, retrying");
                            continue;
                        }
                        return Err(e);
                    }
                }
            }
        })
    }
}

impl std::fmt::Debug for RestBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestBroadcaster")
            .field("url", &self.rest.url())
            .field("address", &self.signer.address())
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

// ============================================================================
// Sign document
// ============================================================================

fn fee_json(fee: Fee) -> Value {
    json!({
        "amount": [{"amount": fee.amount.to_string(), "denom": DENOM}],
        "gas": fee.gas.to_string(),
    })
}

/// Build the `StdSignDoc` for a transaction.
///
/// `serde_json::Map` is ordered by key, so serializing the document yields
/// the sorted-key bytes the chain verifies signatures against.
fn sign_doc(
    chain_id: &str,
    account: AccountSequence,
    fee: &Value,
    memo: &str,
    msgs: &Value,
) -> Value {
    json!({
        "account_number": account.account_number.to_string(),
        "chain_id": chain_id,
        "fee": fee,
        "memo": memo,
        "msgs": msgs,
        "sequence": account.sequence.to_string(),
    })
}

/// Serialize a sign document the way the chain does.
///
/// Go's JSON encoder writes `&`, `<` and `>` as unicode escapes, and the
/// chain verifies against those bytes.
fn sign_bytes(doc: &Value) -> Result<Vec<u8>, Error> {
    let json = serde_json::to_string(doc)?
        .replace('&', "\\u0026")
        .replace('<', "\\u003c")
        .replace('>', "\\u003e");
    Ok(json.into_bytes())
}

fn is_sequence_mismatch(err: &Error) -> bool {
    err.raw_log().is_some_and(|log| {
        log.contains("signature verification failed") || log.contains("incorrect account sequence")
    })
}

// ============================================================================
// Broadcast response
// ============================================================================

#[serde_as]
#[derive(Debug, Deserialize)]
struct BroadcastResponse {
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[serde(default)]
    height: u64,
    #[serde(default)]
    txhash: String,
    #[serde(default)]
    code: Option<u32>,
    #[serde(default)]
    raw_log: String,
    /// Hex-encoded concatenation of per-message JSON results.
    #[serde(default)]
    data: Option<String>,
}

impl BroadcastResponse {
    fn into_result(self) -> Result<ChainTxResult, Error> {
        if let Some(code) = self.code.filter(|code| *code != 0) {
            tracing::debug!(code, raw_log = %self.raw_log, "transaction rejected");
            return Err(Error::ChainRejected {
                code,
                raw_log: self.raw_log,
            });
        }

        let data = match self.data.as_deref() {
            None | Some("") => Vec::new(),
            Some(hex_data) => {
                let bytes = hex::decode(hex_data).map_err(|e| {
                    RpcError::InvalidResponse(format!("transaction data is not hex: {e}"))
                })?;
                ChainTxResult::parse_data(&bytes)?
            }
        };

        Ok(ChainTxResult::new(self.height, self.txhash, data))
    }
}
