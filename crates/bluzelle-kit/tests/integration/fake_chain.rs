//! An in-memory chain that speaks the same messages and query paths as a
//! Bluzelle node.
//!
//! Transactions apply atomically: if any message fails, the store is left
//! untouched and the whole batch is rejected. Result entries come back in
//! reverse order so tests exercise content matching rather than position.
//! Block height advances every 5 seconds of tokio time, so paused-clock
//! tests can expire leases with `tokio::time::advance`.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use bluzelle_kit::*;
use serde_json::{Value, json};
use tokio::time::Instant;

/// Lease applied when a message asks for zero blocks (10 days).
const DEFAULT_LEASE_BLOCKS: u64 = 172_800;

const CODE_INTERNAL: u32 = 1;
const CODE_INSUFFICIENT_FUNDS: u32 = 5;

#[derive(Clone, Debug)]
struct Entry {
    value: String,
    owner: String,
    expires_at: u64,
}

#[derive(Clone, Default)]
struct Ledger {
    /// (uuid, encoded key) -> entry
    store: BTreeMap<(String, String), Entry>,
    /// Balances in ubnt.
    balances: HashMap<String, u128>,
}

struct Inner {
    ledger: Mutex<Ledger>,
    batches: Mutex<Vec<Vec<Msg>>>,
    started: Instant,
}

/// Cheap to clone; clones share one chain.
#[derive(Clone)]
pub struct FakeChain {
    inner: Arc<Inner>,
}

impl FakeChain {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                ledger: Mutex::new(Ledger::default()),
                batches: Mutex::new(Vec::new()),
                started: Instant::now(),
            }),
        }
    }

    /// Current block height.
    pub fn height(&self) -> u64 {
        self.inner.started.elapsed().as_secs() / BLOCK_TIME_IN_SECONDS as u64 + 1
    }

    /// Credit `address` with `ubnt`.
    pub fn fund(&self, address: &str, ubnt: u128) {
        let mut ledger = self.inner.ledger.lock().unwrap();
        *ledger.balances.entry(address.to_string()).or_default() += ubnt;
    }

    /// Number of messages in each transaction submitted so far.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.inner
            .batches
            .lock()
            .unwrap()
            .iter()
            .map(Vec::len)
            .collect()
    }

    /// A signing client for `owner` on namespace `uuid`.
    pub fn client(&self, uuid: &str, owner: &str) -> Bluzelle {
        Bluzelle::builder(DEFAULT_ENDPOINT, DEFAULT_CHAIN_ID, uuid)
            .address(owner)
            .broadcaster(self.clone())
            .query_service(self.clone())
            .build()
    }

    /// A client with no broadcaster.
    pub fn read_only_client(&self, uuid: &str) -> Bluzelle {
        Bluzelle::builder(DEFAULT_ENDPOINT, DEFAULT_CHAIN_ID, uuid)
            .query_service(self.clone())
            .build()
    }

    fn execute(&self, msgs: &[Msg]) -> Result<ChainTxResult, Error> {
        self.inner.batches.lock().unwrap().push(msgs.to_vec());

        let height = self.height();
        let mut ledger = self.inner.ledger.lock().unwrap();
        let mut scratch = ledger.clone();
        let mut data = Vec::new();
        for msg in msgs {
            if let Some(entry) = scratch.apply(msg, height)? {
                data.push(entry);
            }
        }
        *ledger = scratch;
        drop(ledger);

        data.reverse();
        let txhash = format!("{:064X}", self.inner.batches.lock().unwrap().len());
        Ok(ChainTxResult::new(height, txhash, data))
    }

    fn answer(&self, path: &str) -> Result<Value, Error> {
        let height = self.height();
        let ledger = self.inner.ledger.lock().unwrap();
        let parts: Vec<&str> = path.split('/').collect();

        match parts.as_slice() {
            ["crud", "read" | "pread", uuid, key] => {
                let entry = ledger.live(uuid, key, height).ok_or_else(not_found)?;
                Ok(json!({ "key": key, "value": entry.value }))
            }
            ["crud", "has", uuid, key] => {
                let has = ledger.live(uuid, key, height).is_some();
                Ok(json!({ "key": key, "has": has }))
            }
            ["crud", "getlease", uuid, key] => {
                let entry = ledger.live(uuid, key, height).ok_or_else(not_found)?;
                Ok(json!({ "key": key, "lease": (entry.expires_at - height).to_string() }))
            }
            ["crud", "keys", uuid] => Ok(json!({ "keys": ledger.keys(uuid, height, None) })),
            ["crud", "keyvalues", uuid] => {
                Ok(json!({ "keyvalues": ledger.key_values(uuid, height) }))
            }
            ["crud", "count", uuid] => {
                Ok(json!({ "count": ledger.keys(uuid, height, None).len().to_string() }))
            }
            ["crud", "getnshortestleases", uuid, n] => {
                let n: usize = n.parse().map_err(|_| not_found())?;
                Ok(json!({ "keyleases": ledger.shortest_leases(uuid, height, n) }))
            }
            ["crud", "mykeys", owner, uuid] => {
                Ok(json!({ "keys": ledger.keys(uuid, height, Some(*owner)) }))
            }
            ["auth", "accounts", address] => {
                let balance = ledger.balances.get(*address).ok_or_else(not_found)?;
                Ok(json!({
                    "type": "cosmos-sdk/Account",
                    "value": {
                        "address": address,
                        "coins": [{ "denom": DENOM, "amount": balance.to_string() }],
                        "account_number": "7",
                        "sequence": self.inner.batches.lock().unwrap().len().to_string(),
                    }
                }))
            }
            ["node_info"] => Ok(json!({
                "node_info": { "network": DEFAULT_CHAIN_ID },
                "application_version": { "name": "BluzelleService", "version": "0.0.0-fake" }
            })),
            _ => Err(not_found()),
        }
    }
}

impl Broadcaster for FakeChain {
    fn submit<'a>(&'a self, msgs: &'a [Msg], _fee: Fee) -> BroadcastFuture<'a> {
        Box::pin(async move { self.execute(msgs) })
    }
}

impl QueryService for FakeChain {
    fn query<'a>(&'a self, path: &'a str) -> QueryFuture<'a> {
        Box::pin(async move { self.answer(path) })
    }
}

fn not_found() -> Error {
    Error::Rpc(RpcError::Http {
        status: 404,
        message: "Not Found".to_string(),
    })
}

fn rejected(code: u32, raw_log: impl Into<String>) -> Error {
    Error::ChainRejected {
        code,
        raw_log: raw_log.into(),
    }
}

fn expiry(height: u64, lease: u64) -> u64 {
    let lease = if lease == 0 { DEFAULT_LEASE_BLOCKS } else { lease };
    height + lease
}

impl Ledger {
    fn live(&self, uuid: &str, key: &str, height: u64) -> Option<&Entry> {
        self.store
            .get(&(uuid.to_string(), key.to_string()))
            .filter(|e| e.expires_at > height)
    }

    fn live_entries<'a>(
        &'a self,
        uuid: &'a str,
        height: u64,
    ) -> impl Iterator<Item = (&'a String, &'a Entry)> + 'a {
        self.store
            .iter()
            .filter(move |((u, _), e)| u == uuid && e.expires_at > height)
            .map(|((_, k), e)| (k, e))
    }

    fn keys(&self, uuid: &str, height: u64, owner: Option<&str>) -> Vec<String> {
        self.live_entries(uuid, height)
            .filter(|(_, e)| owner.is_none_or(|o| e.owner == o))
            .map(|(k, _)| k.clone())
            .collect()
    }

    fn key_values(&self, uuid: &str, height: u64) -> Vec<Value> {
        self.live_entries(uuid, height)
            .map(|(k, e)| json!({ "key": k, "value": e.value }))
            .collect()
    }

    fn shortest_leases(&self, uuid: &str, height: u64, n: usize) -> Vec<Value> {
        let mut leases: Vec<(u64, &String)> = self
            .live_entries(uuid, height)
            .map(|(k, e)| (e.expires_at - height, k))
            .collect();
        leases.sort();
        leases
            .into_iter()
            .take(n)
            .map(|(lease, k)| json!({ "key": k, "lease": lease.to_string() }))
            .collect()
    }

    /// Entry owned by `owner`, or the reason it cannot be touched.
    fn owned_mut(
        &mut self,
        uuid: &str,
        key: &str,
        owner: &str,
        height: u64,
    ) -> Result<&mut Entry, Error> {
        let entry = self
            .store
            .get_mut(&(uuid.to_string(), key.to_string()))
            .filter(|e| e.expires_at > height)
            .ok_or_else(|| rejected(CODE_INTERNAL, format!("key not found: {key}")))?;
        if entry.owner != owner {
            return Err(rejected(CODE_INTERNAL, "Incorrect Owner"));
        }
        Ok(entry)
    }

    fn apply(&mut self, msg: &Msg, height: u64) -> Result<Option<Value>, Error> {
        match msg {
            Msg::Create(m) => {
                if self.live(&m.uuid, &m.key, height).is_some() {
                    return Err(rejected(CODE_INTERNAL, "key already exists"));
                }
                self.store.insert(
                    (m.uuid.clone(), m.key.clone()),
                    Entry {
                        value: m.value.clone(),
                        owner: m.owner.clone(),
                        expires_at: expiry(height, m.lease),
                    },
                );
                Ok(None)
            }
            Msg::Update(m) => {
                let entry = self.owned_mut(&m.uuid, &m.key, &m.owner, height)?;
                entry.value = m.value.clone();
                if m.lease > 0 {
                    entry.expires_at = height + m.lease;
                }
                Ok(None)
            }
            Msg::Delete(m) => {
                self.owned_mut(&m.uuid, &m.key, &m.owner, height)?;
                self.store.remove(&(m.uuid.clone(), m.key.clone()));
                Ok(None)
            }
            Msg::DeleteAll(m) => {
                self.store
                    .retain(|(uuid, _), e| !(uuid == &m.uuid && e.owner == m.owner));
                Ok(None)
            }
            Msg::RenewLease(m) => {
                let entry = self.owned_mut(&m.uuid, &m.key, &m.owner, height)?;
                entry.expires_at = expiry(height, m.lease);
                Ok(None)
            }
            Msg::RenewLeaseAll(m) => {
                for ((uuid, _), e) in self.store.iter_mut() {
                    if uuid == &m.uuid && e.owner == m.owner && e.expires_at > height {
                        e.expires_at = expiry(height, m.lease);
                    }
                }
                Ok(None)
            }
            Msg::MultiUpdate(m) => {
                for pair in &m.key_values {
                    let entry = self.owned_mut(&m.uuid, &pair.key, &m.owner, height)?;
                    entry.value = pair.value.clone();
                }
                Ok(None)
            }
            Msg::Read(m) => Ok(self
                .live(&m.uuid, &m.key, height)
                .map(|e| json!({ "key": m.key, "value": e.value }))),
            Msg::Has(m) => {
                let has = self.live(&m.uuid, &m.key, height).is_some();
                Ok(Some(json!({ "key": m.key, "has": has })))
            }
            Msg::GetLease(m) => Ok(self
                .live(&m.uuid, &m.key, height)
                .map(|e| json!({ "key": m.key, "lease": (e.expires_at - height).to_string() }))),
            Msg::Count(m) => {
                let count = self.keys(&m.uuid, height, None).len();
                Ok(Some(json!({ "count": count.to_string() })))
            }
            Msg::Keys(m) => Ok(Some(json!({ "keys": self.keys(&m.uuid, height, None) }))),
            Msg::KeyValues(m) => Ok(Some(
                json!({ "keyvalues": self.key_values(&m.uuid, height) }),
            )),
            Msg::GetNShortestLeases(m) => {
                let leases = self.shortest_leases(&m.uuid, height, m.n as usize);
                Ok(Some(json!({ "keyleases": leases })))
            }
            Msg::Send(m) => {
                let amount: u128 = m
                    .amount
                    .iter()
                    .filter(|c| c.denom == DENOM)
                    .filter_map(|c| c.amount.parse::<u128>().ok())
                    .sum();
                let from = self.balances.entry(m.from_address.clone()).or_default();
                if *from < amount {
                    return Err(rejected(CODE_INSUFFICIENT_FUNDS, "insufficient funds"));
                }
                *from -= amount;
                *self.balances.entry(m.to_address.clone()).or_default() += amount;
                Ok(None)
            }
        }
    }
}
