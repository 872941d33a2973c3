//! The main Bluzelle client.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{Error, ValidationError};
use crate::types::{
    GasInfo, KeyLease, KeyValue, Lease, TxCountResponse, TxHasResponse, TxKeyValuesResponse,
    TxKeysResponse, TxLeaseResponse, TxLeasesResponse, TxReadResponse, TxResponse,
};

use super::batcher::{Batcher, TxCall};
use super::broadcast::{Broadcaster, RestBroadcaster};
use super::messages::{MessageBuilder, Prepared};
use super::query::{AccountInfo, QueryClient, QueryService, ReadQuery};
use super::rpc::{RestClient, RetryConfig};
use super::signer::{InMemorySigner, Signer};

/// Default REST endpoint of a local light-client daemon.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:1317";

/// Default chain id.
pub const DEFAULT_CHAIN_ID: &str = "bluzelle";

/// Future returned by [`Bluzelle::with_transaction`].
pub type TransactionFuture<R> = Pin<Box<dyn Future<Output = Result<R, Error>> + Send>>;

/// The main client for a Bluzelle namespace.
///
/// Every operation hangs off this type. Mutations and `tx_*` reads are
/// batched into signed transactions and return a [`TxCall`] handle; plain
/// reads go straight to the REST endpoint and need no signer.
///
/// Cloning is cheap and clones share one batcher, so calls made through any
/// clone can end up in the same transaction.
///
/// # Example
///
/// ```rust,no_run
/// use bluzelle_kit::*;
///
/// #[tokio::main]
/// async fn main() -> Result<(), bluzelle_kit::Error> {
///     let bz = Bluzelle::builder("http://localhost:1317", "bluzelle", "my-namespace")
///         .credentials("bluzelle1...", "<hex secret key>")?
///         .build();
///
///     bz.create("greeting", "hello", Lease::hours(1)).await?;
///     println!("{}", bz.read("greeting").await?);
///
///     // Several operations, one transaction
///     let (a, b) = bz
///         .with_transaction(|bz| (bz.update("greeting", "hi", Lease::ZERO), bz.tx_count()))
///         .await?;
///     a.await?;
///     println!("{} keys", b.await?.count);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Bluzelle {
    endpoint: String,
    uuid: String,
    address: Option<String>,
    queries: QueryClient,
    messages: MessageBuilder,
    batcher: Option<Arc<Batcher>>,
    gas: GasInfo,
}

impl Bluzelle {
    /// Create a builder for a namespace on the given endpoint and chain.
    pub fn builder(
        endpoint: impl Into<String>,
        chain_id: impl Into<String>,
        uuid: impl Into<String>,
    ) -> BluzelleBuilder {
        BluzelleBuilder::new(endpoint, chain_id, uuid)
    }

    /// Create a client from environment variables.
    ///
    /// - `BLUZELLE_UUID` (required): the namespace to operate on
    /// - `BLUZELLE_ENDPOINT` (optional): REST endpoint, defaults to [`DEFAULT_ENDPOINT`]
    /// - `BLUZELLE_CHAIN_ID` (optional): defaults to [`DEFAULT_CHAIN_ID`]
    /// - `BLUZELLE_ADDRESS` / `BLUZELLE_PRIVATE_KEY` (optional): signing account
    ///
    /// Without an address and key the client is read-only.
    ///
    /// # Errors
    ///
    /// Returns an error if `BLUZELLE_UUID` is missing, if only one of the
    /// address and key is set, or if the key is invalid.
    pub fn from_env() -> Result<Bluzelle, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Bluzelle, Error> {
        let uuid =
            lookup("BLUZELLE_UUID").ok_or_else(|| Error::Config("BLUZELLE_UUID is not set".into()))?;
        let endpoint = lookup("BLUZELLE_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let chain_id = lookup("BLUZELLE_CHAIN_ID").unwrap_or_else(|| DEFAULT_CHAIN_ID.to_string());

        let mut builder = Bluzelle::builder(endpoint, chain_id, uuid);

        match (lookup("BLUZELLE_ADDRESS"), lookup("BLUZELLE_PRIVATE_KEY")) {
            (Some(address), Some(key)) => {
                builder = builder.credentials(&address, &key)?;
            }
            (Some(_), None) => {
                return Err(Error::Config(
                    "BLUZELLE_ADDRESS is set but BLUZELLE_PRIVATE_KEY is missing".into(),
                ));
            }
            (None, Some(_)) => {
                return Err(Error::Config(
                    "BLUZELLE_PRIVATE_KEY is set but BLUZELLE_ADDRESS is missing".into(),
                ));
            }
            (None, None) => {
                // Read-only client
            }
        }

        Ok(builder.build())
    }

    /// The REST endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The namespace this client operates on.
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// The account that owns this client's keys, if one is configured.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// A clone of this client whose batched calls carry `gas`.
    ///
    /// The clone shares the batcher, so its calls still join the current
    /// batch.
    pub fn with_gas(&self, gas: GasInfo) -> Bluzelle {
        Bluzelle {
            gas,
            ..self.clone()
        }
    }

    fn tx<T>(
        &self,
        prepared: Result<Prepared, ValidationError>,
        convert: fn(crate::types::MatchedResponse) -> Result<T, Error>,
    ) -> TxCall<T> {
        TxCall::queue(
            self.batcher.as_ref(),
            prepared.map_err(Error::from),
            self.gas,
            convert,
        )
    }

    // ========================================================================
    // Batched mutations
    // ========================================================================

    /// Create `key` with `value`. Fails if the key already exists.
    ///
    /// [`Lease::ZERO`] leaves the lease to the chain's default.
    pub fn create(&self, key: &str, value: &str, lease: Lease) -> TxCall<TxResponse> {
        self.tx(self.messages.create(key, value, lease), |m| Ok(m.into()))
    }

    /// Replace the value of an existing `key`.
    pub fn update(&self, key: &str, value: &str, lease: Lease) -> TxCall<TxResponse> {
        self.tx(self.messages.update(key, value, lease), |m| Ok(m.into()))
    }

    pub fn delete(&self, key: &str) -> TxCall<TxResponse> {
        self.tx(self.messages.delete(key), |m| Ok(m.into()))
    }

    /// Delete every key in the namespace.
    pub fn delete_all(&self) -> TxCall<TxResponse> {
        self.tx(Ok(self.messages.delete_all()), |m| Ok(m.into()))
    }

    pub fn renew_lease(&self, key: &str, lease: Lease) -> TxCall<TxResponse> {
        self.tx(self.messages.renew_lease(key, lease), |m| Ok(m.into()))
    }

    /// Renew the lease of every key in the namespace.
    pub fn renew_lease_all(&self, lease: Lease) -> TxCall<TxResponse> {
        self.tx(self.messages.renew_lease_all(lease), |m| Ok(m.into()))
    }

    /// Update several existing keys in one message.
    pub fn multi_update(&self, key_values: &[KeyValue]) -> TxCall<TxResponse> {
        self.tx(self.messages.multi_update(key_values), |m| Ok(m.into()))
    }

    /// Send `amount` BNT from this client's account to `to_address`.
    pub fn transfer_tokens_to(&self, to_address: &str, amount: u64) -> TxCall<TxResponse> {
        self.tx(Ok(self.messages.transfer(to_address, amount)), |m| {
            Ok(m.into())
        })
    }

    // ========================================================================
    // Batched reads
    // ========================================================================

    /// Read a value inside a transaction. Fails with [`Error::KeyNotFound`]
    /// when the chain returns no value for the key.
    pub fn tx_read(&self, key: &str) -> TxCall<TxReadResponse> {
        self.tx(self.messages.read(key), |m| TxReadResponse::try_from(m))
    }

    pub fn tx_has(&self, key: &str) -> TxCall<TxHasResponse> {
        self.tx(self.messages.has(key), |m| Ok(m.into()))
    }

    pub fn tx_count(&self) -> TxCall<TxCountResponse> {
        self.tx(Ok(self.messages.count()), |m| Ok(m.into()))
    }

    pub fn tx_keys(&self) -> TxCall<TxKeysResponse> {
        self.tx(Ok(self.messages.keys()), |m| Ok(m.into()))
    }

    pub fn tx_key_values(&self) -> TxCall<TxKeyValuesResponse> {
        self.tx(Ok(self.messages.key_values()), |m| Ok(m.into()))
    }

    /// Remaining lease of `key` in seconds.
    pub fn tx_get_lease(&self, key: &str) -> TxCall<TxLeaseResponse> {
        self.tx(self.messages.get_lease(key), |m| Ok(m.into()))
    }

    pub fn tx_get_n_shortest_leases(&self, n: u64) -> TxCall<TxLeasesResponse> {
        self.tx(Ok(self.messages.get_n_shortest_leases(n)), |m| {
            Ok(m.into())
        })
    }

    // ========================================================================
    // Batching control
    // ========================================================================

    /// Run `f` inside a transaction scope.
    ///
    /// Every batched call `f` makes goes into one transaction, sent when the
    /// scope closes. The future resolves to `f`'s return value once that
    /// transaction settles; handles returned from `f` then resolve without
    /// another round trip.
    ///
    /// Scopes do not nest: starting a scope while one is open resolves to
    /// [`Error::NestedTransactionNotAllowed`] and leaves the open scope alone.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use bluzelle_kit::*;
    /// # async fn example(bz: Bluzelle) -> Result<(), Error> {
    /// bz.with_transaction(|bz| {
    ///     for i in 0..4 {
    ///         let _ = bz.create(&format!("foo{i}"), &format!("bar{i}"), Lease::ZERO);
    ///     }
    /// })
    /// .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_transaction<R, F>(&self, f: F) -> TransactionFuture<R>
    where
        R: Send + 'static,
        F: FnOnce(&Bluzelle) -> R,
    {
        match &self.batcher {
            Some(batcher) => batcher.scoped(|| f(self)),
            None => Box::pin(std::future::ready(Err(Error::NoSigner))),
        }
    }

    /// Cap the number of messages per transaction; larger batches are split
    /// and sent in order. Values below 1 are treated as 1.
    pub fn set_max_messages_per_transaction(&self, max: usize) {
        if let Some(batcher) = &self.batcher {
            batcher.set_max_messages(max);
        }
    }

    /// Send every batch that is ready without awaiting a handle.
    pub async fn flush(&self) {
        if let Some(batcher) = &self.batcher {
            batcher.flush().await;
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Read the value of `key`.
    pub fn read(&self, key: impl Into<String>) -> ReadQuery {
        ReadQuery::new(self.queries.clone(), key)
    }

    pub async fn has(&self, key: &str) -> Result<bool, Error> {
        self.queries.has(key).await
    }

    pub async fn keys(&self) -> Result<Vec<String>, Error> {
        self.queries.keys().await
    }

    pub async fn key_values(&self) -> Result<Vec<KeyValue>, Error> {
        self.queries.key_values().await
    }

    pub async fn count(&self) -> Result<u64, Error> {
        self.queries.count().await
    }

    /// Remaining lease of `key` in seconds.
    pub async fn get_lease(&self, key: &str) -> Result<u64, Error> {
        self.queries.get_lease(key).await
    }

    /// The `n` keys closest to expiry, with their leases in seconds.
    pub async fn get_n_shortest_leases(&self, n: u64) -> Result<Vec<KeyLease>, Error> {
        self.queries.get_n_shortest_leases(n).await
    }

    /// Keys in this namespace owned by this client's account.
    pub async fn my_keys(&self) -> Result<Vec<String>, Error> {
        let owner = self.address.as_deref().ok_or(Error::NoSigner)?;
        self.queries.my_keys(owner).await
    }

    /// This client's account on chain.
    pub async fn account(&self) -> Result<AccountInfo, Error> {
        let address = self.address.as_deref().ok_or(Error::NoSigner)?;
        self.queries.account(address).await
    }

    /// Application version of the node behind the endpoint.
    pub async fn version(&self) -> Result<String, Error> {
        self.queries.version().await
    }
}

impl std::fmt::Debug for Bluzelle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bluzelle")
            .field("endpoint", &self.endpoint)
            .field("uuid", &self.uuid)
            .field("address", &self.address)
            .field("gas", &self.gas)
            .finish()
    }
}

// ============================================================================
// BluzelleBuilder
// ============================================================================

/// Builder for creating a [`Bluzelle`] client.
///
/// # Example
///
/// ```rust,ignore
/// use bluzelle_kit::*;
///
/// // Read-only client
/// let bz = Bluzelle::builder("http://localhost:1317", "bluzelle", "ns").build();
///
/// // Signing client with a default gas budget and a message cap
/// let bz = Bluzelle::builder("http://localhost:1317", "bluzelle", "ns")
///     .credentials("bluzelle1...", "<hex secret key>")?
///     .gas_info(GasInfo::default().max_gas(400_000))
///     .max_messages_per_transaction(50)
///     .build();
/// ```
pub struct BluzelleBuilder {
    endpoint: String,
    chain_id: String,
    uuid: String,
    signer: Option<Arc<dyn Signer>>,
    address: Option<String>,
    retry_config: RetryConfig,
    gas: GasInfo,
    memo: String,
    max_messages: Option<usize>,
    broadcaster: Option<Arc<dyn Broadcaster>>,
    query_service: Option<Arc<dyn QueryService>>,
}

impl BluzelleBuilder {
    fn new(endpoint: impl Into<String>, chain_id: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            chain_id: chain_id.into(),
            uuid: uuid.into(),
            signer: None,
            address: None,
            retry_config: RetryConfig::default(),
            gas: GasInfo::default(),
            memo: String::new(),
            max_messages: None,
            broadcaster: None,
            query_service: None,
        }
    }

    /// Set the signer for transactions.
    ///
    /// The signer's address becomes the owner of every key this client writes.
    pub fn signer(mut self, signer: impl Signer + 'static) -> Self {
        self.signer = Some(Arc::new(signer));
        self
    }

    /// Set up signing from an account address and a hex secret key.
    pub fn credentials(
        mut self,
        address: impl AsRef<str>,
        secret_key_hex: impl AsRef<str>,
    ) -> Result<Self, Error> {
        let signer = InMemorySigner::new(address, secret_key_hex)?;
        self.signer = Some(Arc::new(signer));
        Ok(self)
    }

    /// Set the owner address explicitly. Only needed with a custom
    /// [`Broadcaster`] and no signer.
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Set the retry configuration for REST calls.
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Default gas settings for batched calls.
    pub fn gas_info(mut self, gas: GasInfo) -> Self {
        self.gas = gas;
        self
    }

    /// Memo attached to every transaction.
    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    pub fn max_messages_per_transaction(mut self, max: usize) -> Self {
        self.max_messages = Some(max);
        self
    }

    /// Replace the REST broadcaster.
    pub fn broadcaster(mut self, broadcaster: impl Broadcaster + 'static) -> Self {
        self.broadcaster = Some(Arc::new(broadcaster));
        self
    }

    /// Replace the REST query service.
    pub fn query_service(mut self, service: impl QueryService + 'static) -> Self {
        self.query_service = Some(Arc::new(service));
        self
    }

    /// Build the client.
    pub fn build(self) -> Bluzelle {
        let rest = Arc::new(RestClient::with_retry_config(
            self.endpoint,
            self.retry_config,
        ));

        let address = self
            .address
            .or_else(|| self.signer.as_ref().map(|s| s.address().to_string()));

        let broadcaster: Option<Arc<dyn Broadcaster>> = match (self.broadcaster, self.signer) {
            (Some(custom), _) => Some(custom),
            (None, Some(signer)) => Some(Arc::new(
                RestBroadcaster::new(rest.clone(), signer, self.chain_id).memo(self.memo),
            )),
            (None, None) => None,
        };

        let batcher = broadcaster.map(|b| {
            let batcher = Batcher::new(b);
            if let Some(max) = self.max_messages {
                batcher.set_max_messages(max);
            }
            Arc::new(batcher)
        });

        let query_service: Arc<dyn QueryService> = match self.query_service {
            Some(custom) => custom,
            None => rest.clone(),
        };

        Bluzelle {
            endpoint: rest.url().to_string(),
            queries: QueryClient::new(query_service, self.uuid.clone()),
            messages: MessageBuilder::new(self.uuid.clone(), address.clone().unwrap_or_default()),
            uuid: self.uuid,
            address,
            batcher,
            gas: self.gas,
        }
    }
}

impl From<BluzelleBuilder> for Bluzelle {
    fn from(builder: BluzelleBuilder) -> Self {
        builder.build()
    }
}
