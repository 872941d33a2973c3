//! Core types for the Bluzelle key-value store.

mod encoding;
mod gas;
mod lease;
mod message;
mod response;

pub use encoding::{decode_safe, encode_safe};
pub use gas::{DEFAULT_GAS_PRICE, DEFAULT_MAX_GAS, DENOM, Fee, GasInfo};
pub use lease::{BLOCK_TIME_IN_SECONDS, Lease, blocks_to_seconds};
pub use message::{
    Coin, KeyMsg, KeyValueMsg, KeyValuePair, MultiUpdateMsg, Msg, NShortestLeasesMsg,
    NamespaceMsg, RenewLeaseAllMsg, RenewLeaseMsg, SendMsg,
};
pub(crate) use response::{RawKeyLease, parse_u64};
pub use response::{
    ChainTxResult, Correlation, KeyLease, KeyValue, MatchedResponse, TxCountResponse,
    TxHasResponse, TxKeyValuesResponse, TxKeysResponse, TxLeaseResponse, TxLeasesResponse,
    TxReadResponse, TxResponse,
};
