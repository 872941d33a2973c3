//! Read-only queries against the chain's REST endpoints.
//!
//! Queries are not batched and need no signer. [`ReadQuery`] implements
//! `IntoFuture` so it can be `.await`ed directly or refined with
//! [`ReadQuery::prove`] first.

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{DisplayFromStr, PickFirst, serde_as};

use crate::error::{Error, RpcError};
use crate::types::{
    Coin, KeyLease, KeyValue, RawKeyLease, blocks_to_seconds, decode_safe, encode_safe, parse_u64,
};

use super::rpc::RestClient;

/// Future returned by [`QueryService::query`].
pub type QueryFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, Error>> + Send + 'a>>;

// ============================================================================
// QueryService
// ============================================================================

/// A read-only view of the chain's REST query surface.
///
/// `query` receives a path relative to the endpoint (for example
/// `crud/count/my-namespace`) and returns the unwrapped `result` payload.
/// Non-success statuses surface as [`RpcError::Http`].
pub trait QueryService: Send + Sync {
    fn query<'a>(&'a self, path: &'a str) -> QueryFuture<'a>;
}

impl QueryService for RestClient {
    fn query<'a>(&'a self, path: &'a str) -> QueryFuture<'a> {
        Box::pin(async move { Ok(self.get_result(path).await?) })
    }
}

/// Turn a 404 into [`Error::KeyNotFound`].
fn not_found_as_missing_key(err: Error) -> Error {
    match err {
        Error::Rpc(ref rpc) if rpc.is_not_found() => Error::KeyNotFound,
        other => other,
    }
}

fn invalid(message: &str) -> Error {
    Error::Rpc(RpcError::InvalidResponse(message.to_string()))
}

// ============================================================================
// Account info
// ============================================================================

/// An account as reported by `auth/accounts/{address}`.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub coins: Vec<Coin>,
    #[serde(default)]
    pub public_key: Option<Value>,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[serde(default)]
    pub account_number: u64,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[serde(default)]
    pub sequence: u64,
}

impl AccountInfo {
    /// Parse the `result` payload of an account query.
    ///
    /// Accounts come wrapped as `{"type": "cosmos-sdk/Account", "value": {...}}`.
    pub(crate) fn from_result(result: Value) -> Result<Self, Error> {
        let value = match result {
            Value::Object(mut map) if map.contains_key("value") => map
                .remove("value")
                .ok_or_else(|| invalid("missing account value"))?,
            other => other,
        };
        Ok(serde_json::from_value(value)?)
    }
}

// ============================================================================
// QueryClient
// ============================================================================

/// Namespace-scoped query helpers shared by [`Bluzelle`](super::Bluzelle).
#[derive(Clone)]
pub(crate) struct QueryClient {
    service: Arc<dyn QueryService>,
    uuid: String,
}

impl QueryClient {
    pub(crate) fn new(service: Arc<dyn QueryService>, uuid: impl Into<String>) -> Self {
        Self {
            service,
            uuid: uuid.into(),
        }
    }

    async fn get(&self, path: String) -> Result<Value, Error> {
        tracing::trace!(path = %path, "query");
        self.service.query(&path).await
    }

    pub(crate) async fn read(&self, key: &str, prove: bool) -> Result<String, Error> {
        let kind = if prove { "pread" } else { "read" };
        let path = format!("crud/{}/{}/{}", kind, self.uuid, encode_safe(key));
        let result = self.get(path).await.map_err(not_found_as_missing_key)?;
        let value = result
            .get("value")
            .and_then(Value::as_str)
            .ok_or(Error::KeyNotFound)?;
        Ok(decode_safe(value).into_owned())
    }

    pub(crate) async fn has(&self, key: &str) -> Result<bool, Error> {
        let path = format!("crud/has/{}/{}", self.uuid, encode_safe(key));
        let result = self.get(path).await?;
        Ok(result.get("has").and_then(Value::as_bool).unwrap_or(false))
    }

    pub(crate) async fn keys(&self) -> Result<Vec<String>, Error> {
        let result = self.get(format!("crud/keys/{}", self.uuid)).await?;
        Ok(decoded_keys(&result))
    }

    pub(crate) async fn key_values(&self) -> Result<Vec<KeyValue>, Error> {
        let result = self.get(format!("crud/keyvalues/{}", self.uuid)).await?;
        let key_values = match result.get("keyvalues") {
            Some(Value::Null) | None => Vec::new(),
            Some(raw) => serde_json::from_value::<Vec<KeyValue>>(raw.clone())?,
        };
        Ok(key_values.into_iter().map(KeyValue::decoded).collect())
    }

    pub(crate) async fn count(&self) -> Result<u64, Error> {
        let result = self.get(format!("crud/count/{}", self.uuid)).await?;
        Ok(result.get("count").and_then(parse_u64).unwrap_or(0))
    }

    pub(crate) async fn get_lease(&self, key: &str) -> Result<u64, Error> {
        let path = format!("crud/getlease/{}/{}", self.uuid, encode_safe(key));
        let result = self.get(path).await.map_err(not_found_as_missing_key)?;
        let blocks = result
            .get("lease")
            .and_then(parse_u64)
            .ok_or_else(|| invalid("missing lease"))?;
        Ok(blocks_to_seconds(blocks))
    }

    pub(crate) async fn get_n_shortest_leases(&self, n: u64) -> Result<Vec<KeyLease>, Error> {
        let path = format!("crud/getnshortestleases/{}/{}", self.uuid, n);
        let result = self.get(path).await?;
        let raw = match result.get("keyleases") {
            Some(Value::Null) | None => Vec::new(),
            Some(raw) => serde_json::from_value::<Vec<RawKeyLease>>(raw.clone())?,
        };
        Ok(raw.into_iter().map(KeyLease::from).collect())
    }

    pub(crate) async fn my_keys(&self, owner: &str) -> Result<Vec<String>, Error> {
        let result = self
            .get(format!("crud/mykeys/{}/{}", owner, self.uuid))
            .await?;
        Ok(decoded_keys(&result))
    }

    pub(crate) async fn account(&self, address: &str) -> Result<AccountInfo, Error> {
        let result = self.get(format!("auth/accounts/{}", address)).await?;
        AccountInfo::from_result(result)
    }

    pub(crate) async fn version(&self) -> Result<String, Error> {
        let result = self.get("node_info".to_string()).await?;
        result
            .pointer("/application_version/version")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| invalid("missing application_version.version"))
    }
}

fn decoded_keys(result: &Value) -> Vec<String> {
    result
        .get("keys")
        .and_then(Value::as_array)
        .map(|keys| {
            keys.iter()
                .filter_map(Value::as_str)
                .map(|k| decode_safe(k).into_owned())
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// ReadQuery
// ============================================================================

/// Query builder for reading a single value.
///
/// # Example
///
/// ```rust,no_run
/// # use bluzelle_kit::*;
/// # async fn example(bz: Bluzelle) -> Result<(), Error> {
/// // Fast read
/// let value = bz.read("greeting").await?;
///
/// // Read with a proof checked by the light client
/// let value = bz.read("greeting").prove().await?;
/// # Ok(())
/// # }
/// ```
pub struct ReadQuery {
    client: QueryClient,
    key: String,
    prove: bool,
}

impl ReadQuery {
    pub(crate) fn new(client: QueryClient, key: impl Into<String>) -> Self {
        Self {
            client,
            key: key.into(),
            prove: false,
        }
    }

    /// Request a proven read (`crud/pread`).
    pub fn prove(mut self) -> Self {
        self.prove = true;
        self
    }
}

impl IntoFuture for ReadQuery {
    type Output = Result<String, Error>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.client.read(&self.key, self.prove).await })
    }
}
