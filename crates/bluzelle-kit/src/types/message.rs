//! Typed chain messages in their amino-JSON form.
//!
//! Every message serializes as `{"type": "crud/...", "value": {...}}`, which is
//! what the chain's legacy REST endpoint expects inside `tx.msg`.

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};

/// A message addressed to a single key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyMsg {
    pub key: String,
    #[serde(rename = "UUID")]
    pub uuid: String,
    pub owner: String,
}

/// A message that writes a value under a key with a lease.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyValueMsg {
    pub key: String,
    pub value: String,
    #[serde(rename = "UUID")]
    pub uuid: String,
    pub owner: String,
    #[serde_as(as = "DisplayFromStr")]
    pub lease: u64,
}

/// A message addressed to the whole namespace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NamespaceMsg {
    #[serde(rename = "UUID")]
    pub uuid: String,
    pub owner: String,
}

/// Renew the lease of one key.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RenewLeaseMsg {
    pub key: String,
    #[serde_as(as = "DisplayFromStr")]
    pub lease: u64,
    #[serde(rename = "UUID")]
    pub uuid: String,
    pub owner: String,
}

/// Renew the lease of every key in the namespace.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RenewLeaseAllMsg {
    #[serde_as(as = "DisplayFromStr")]
    pub lease: u64,
    #[serde(rename = "UUID")]
    pub uuid: String,
    pub owner: String,
}

/// A key/value pair as carried by `crud/multiupdate`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePair {
    pub key: String,
    pub value: String,
}

/// Update several existing keys at once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MultiUpdateMsg {
    pub key_values: Vec<KeyValuePair>,
    #[serde(rename = "UUID")]
    pub uuid: String,
    pub owner: String,
}

/// Ask for the `n` keys closest to expiry.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NShortestLeasesMsg {
    #[serde_as(as = "DisplayFromStr")]
    pub n: u64,
    #[serde(rename = "UUID")]
    pub uuid: String,
    pub owner: String,
}

/// A token amount.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub amount: String,
    pub denom: String,
}

/// Bank transfer between accounts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMsg {
    pub from_address: String,
    pub to_address: String,
    pub amount: Vec<Coin>,
}

/// A message that can be placed in a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Msg {
    #[serde(rename = "crud/create")]
    Create(KeyValueMsg),
    #[serde(rename = "crud/update")]
    Update(KeyValueMsg),
    #[serde(rename = "crud/delete")]
    Delete(KeyMsg),
    #[serde(rename = "crud/deleteall")]
    DeleteAll(NamespaceMsg),
    #[serde(rename = "crud/read")]
    Read(KeyMsg),
    #[serde(rename = "crud/has")]
    Has(KeyMsg),
    #[serde(rename = "crud/getlease")]
    GetLease(KeyMsg),
    #[serde(rename = "crud/getnshortestleases")]
    GetNShortestLeases(NShortestLeasesMsg),
    #[serde(rename = "crud/keys")]
    Keys(NamespaceMsg),
    #[serde(rename = "crud/keyvalues")]
    KeyValues(NamespaceMsg),
    #[serde(rename = "crud/count")]
    Count(NamespaceMsg),
    #[serde(rename = "crud/renewlease")]
    RenewLease(RenewLeaseMsg),
    #[serde(rename = "crud/renewleaseall")]
    RenewLeaseAll(RenewLeaseAllMsg),
    #[serde(rename = "crud/multiupdate")]
    MultiUpdate(MultiUpdateMsg),
    #[serde(rename = "cosmos-sdk/MsgSend")]
    Send(SendMsg),
}

impl Msg {
    /// The amino type tag of this message.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Msg::Create(_) => "crud/create",
            Msg::Update(_) => "crud/update",
            Msg::Delete(_) => "crud/delete",
            Msg::DeleteAll(_) => "crud/deleteall",
            Msg::Read(_) => "crud/read",
            Msg::Has(_) => "crud/has",
            Msg::GetLease(_) => "crud/getlease",
            Msg::GetNShortestLeases(_) => "crud/getnshortestleases",
            Msg::Keys(_) => "crud/keys",
            Msg::KeyValues(_) => "crud/keyvalues",
            Msg::Count(_) => "crud/count",
            Msg::RenewLease(_) => "crud/renewlease",
            Msg::RenewLeaseAll(_) => "crud/renewleaseall",
            Msg::MultiUpdate(_) => "crud/multiupdate",
            Msg::Send(_) => "cosmos-sdk/MsgSend",
        }
    }
}
