//! Transaction results and response correlation.
//!
//! The chain answers a multi-message transaction with a single result whose
//! `data` is an array of per-message objects in no guaranteed order. Each
//! queued message carries a [`Correlation`] describing what its own entry
//! looks like, and [`ChainTxResult::take_match`] hands every entry out at most
//! once.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{DisplayFromStr, PickFirst, serde_as};

use crate::error::Error;

use super::encoding::decode_safe;
use super::lease::blocks_to_seconds;

// ============================================================================
// Correlation
// ============================================================================

/// How a queued message recognizes its entry in a combined result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Correlation {
    /// The message produces no result entry.
    None,
    /// The first entry carrying this field.
    Field(&'static str),
    /// An entry whose `key` equals `key` and which carries `field`.
    KeyField { key: String, field: &'static str },
}

impl Correlation {
    /// Check whether `entry` belongs to this message.
    pub fn matches(&self, entry: &Value) -> bool {
        match self {
            Correlation::None => false,
            Correlation::Field(field) => has_field(entry, field),
            Correlation::KeyField { key, field } => {
                entry.get("key").and_then(Value::as_str) == Some(key.as_str())
                    && has_field(entry, field)
            }
        }
    }
}

fn has_field(entry: &Value, field: &str) -> bool {
    entry.get(field).is_some_and(|v| !v.is_null())
}

// ============================================================================
// ChainTxResult
// ============================================================================

/// The result of one broadcast transaction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChainTxResult {
    pub height: u64,
    pub txhash: String,
    /// Per-message result objects, in the order the chain produced them.
    pub data: Vec<Value>,
}

impl ChainTxResult {
    pub fn new(height: u64, txhash: impl Into<String>, data: Vec<Value>) -> Self {
        Self {
            height,
            txhash: txhash.into(),
            data,
        }
    }

    /// Find, remove and return the first entry matching `correlation`.
    ///
    /// A claimed entry is gone from `data`, so a later call for a message of
    /// the same kind cannot claim it again.
    pub fn take_match(&mut self, correlation: &Correlation) -> MatchedResponse {
        let entry = self
            .data
            .iter()
            .position(|entry| correlation.matches(entry))
            .map(|index| self.data.remove(index));

        MatchedResponse {
            height: self.height,
            txhash: self.txhash.clone(),
            entry,
        }
    }

    /// Parse the raw `data` bytes of a transaction.
    ///
    /// Each message appends its own JSON object, so the bytes are a stream of
    /// concatenated JSON values. Empty input yields no entries.
    pub fn parse_data(bytes: &[u8]) -> Result<Vec<Value>, serde_json::Error> {
        serde_json::Deserializer::from_slice(bytes)
            .into_iter::<Value>()
            .collect()
    }
}

/// Transaction metadata plus the entry claimed by one message, if any.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchedResponse {
    pub height: u64,
    pub txhash: String,
    pub entry: Option<Value>,
}

impl MatchedResponse {
    fn tx(&self) -> TxResponse {
        TxResponse {
            height: self.height,
            txhash: self.txhash.clone(),
        }
    }

    fn field(&self, name: &str) -> Option<&Value> {
        self.entry.as_ref().and_then(|e| e.get(name))
    }
}

/// Accept both `"12"` and `12`.
pub(crate) fn parse_u64(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

// ============================================================================
// Typed transaction responses
// ============================================================================

/// Height and hash of the transaction a message was included in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResponse {
    pub height: u64,
    pub txhash: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxReadResponse {
    pub height: u64,
    pub txhash: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxHasResponse {
    pub height: u64,
    pub txhash: String,
    pub has: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxCountResponse {
    pub height: u64,
    pub txhash: String,
    pub count: u64,
}

/// Remaining lease of a key, in seconds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxLeaseResponse {
    pub height: u64,
    pub txhash: String,
    pub lease: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxKeysResponse {
    pub height: u64,
    pub txhash: String,
    pub keys: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxKeyValuesResponse {
    pub height: u64,
    pub txhash: String,
    pub key_values: Vec<KeyValue>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxLeasesResponse {
    pub height: u64,
    pub txhash: String,
    pub leases: Vec<KeyLease>,
}

impl From<MatchedResponse> for TxResponse {
    fn from(matched: MatchedResponse) -> Self {
        matched.tx()
    }
}

impl TryFrom<MatchedResponse> for TxReadResponse {
    type Error = Error;

    fn try_from(matched: MatchedResponse) -> Result<Self, Error> {
        let value = matched
            .field("value")
            .and_then(Value::as_str)
            .ok_or(Error::KeyNotFound)?;
        Ok(TxReadResponse {
            value: decode_safe(value).into_owned(),
            height: matched.height,
            txhash: matched.txhash,
        })
    }
}

impl From<MatchedResponse> for TxHasResponse {
    fn from(matched: MatchedResponse) -> Self {
        let has = matched
            .field("has")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        TxHasResponse {
            height: matched.height,
            txhash: matched.txhash,
            has,
        }
    }
}

impl From<MatchedResponse> for TxCountResponse {
    fn from(matched: MatchedResponse) -> Self {
        let count = matched.field("count").and_then(parse_u64).unwrap_or(0);
        TxCountResponse {
            height: matched.height,
            txhash: matched.txhash,
            count,
        }
    }
}

impl From<MatchedResponse> for TxLeaseResponse {
    fn from(matched: MatchedResponse) -> Self {
        let blocks = matched.field("lease").and_then(parse_u64).unwrap_or(0);
        TxLeaseResponse {
            height: matched.height,
            txhash: matched.txhash,
            lease: blocks_to_seconds(blocks),
        }
    }
}

impl From<MatchedResponse> for TxKeysResponse {
    fn from(matched: MatchedResponse) -> Self {
        let keys = matched
            .field("keys")
            .and_then(Value::as_array)
            .map(|keys| {
                keys.iter()
                    .filter_map(Value::as_str)
                    .map(|k| decode_safe(k).into_owned())
                    .collect()
            })
            .unwrap_or_default();
        TxKeysResponse {
            height: matched.height,
            txhash: matched.txhash,
            keys,
        }
    }
}

impl From<MatchedResponse> for TxKeyValuesResponse {
    fn from(matched: MatchedResponse) -> Self {
        let key_values = matched
            .field("keyvalues")
            .cloned()
            .and_then(|v| serde_json::from_value::<Vec<KeyValue>>(v).ok())
            .map(|kvs| kvs.into_iter().map(KeyValue::decoded).collect())
            .unwrap_or_default();
        TxKeyValuesResponse {
            height: matched.height,
            txhash: matched.txhash,
            key_values,
        }
    }
}

impl From<MatchedResponse> for TxLeasesResponse {
    fn from(matched: MatchedResponse) -> Self {
        let leases = matched
            .field("keyleases")
            .cloned()
            .and_then(|v| serde_json::from_value::<Vec<RawKeyLease>>(v).ok())
            .map(|raw| raw.into_iter().map(KeyLease::from).collect())
            .unwrap_or_default();
        TxLeasesResponse {
            height: matched.height,
            txhash: matched.txhash,
            leases,
        }
    }
}

// ============================================================================
// Shared payload types
// ============================================================================

/// A stored key and its value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub(crate) fn decoded(self) -> Self {
        Self {
            key: decode_safe(&self.key).into_owned(),
            value: decode_safe(&self.value).into_owned(),
        }
    }
}

/// A key and its remaining lease in seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyLease {
    pub key: String,
    pub lease: u64,
}

/// A key lease as the chain reports it, in blocks.
#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct RawKeyLease {
    pub key: String,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub lease: u64,
}

impl From<RawKeyLease> for KeyLease {
    fn from(raw: RawKeyLease) -> Self {
        KeyLease {
            key: decode_safe(&raw.key).into_owned(),
            lease: blocks_to_seconds(raw.lease),
        }
    }
}
