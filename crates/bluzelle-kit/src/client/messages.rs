//! Validation and construction of batched messages.

use crate::error::ValidationError;
use crate::types::{
    Coin, Correlation, DENOM, KeyMsg, KeyValue, KeyValueMsg, KeyValuePair, Lease, Msg,
    MultiUpdateMsg, NShortestLeasesMsg, NamespaceMsg, RenewLeaseAllMsg, RenewLeaseMsg, SendMsg,
    encode_safe,
};

/// A validated message and the shape of the result entry it expects.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Prepared {
    pub msg: Msg,
    pub correlation: Correlation,
}

impl Prepared {
    fn new(msg: Msg, correlation: Correlation) -> Self {
        Self { msg, correlation }
    }

    /// A message that produces no result entry of its own.
    fn unmatched(msg: Msg) -> Self {
        Self::new(msg, Correlation::None)
    }
}

/// Check a key and return its encoded form.
fn checked_key(key: &str) -> Result<String, ValidationError> {
    if key.is_empty() {
        return Err(ValidationError::KeyCannotBeEmpty);
    }
    if key.contains('/') {
        return Err(ValidationError::KeyCannotContainSlash);
    }
    Ok(encode_safe(key))
}

/// Builds messages for one namespace and owner.
#[derive(Clone, Debug)]
pub(crate) struct MessageBuilder {
    uuid: String,
    owner: String,
}

impl MessageBuilder {
    pub(crate) fn new(uuid: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            owner: owner.into(),
        }
    }

    fn key_msg(&self, key: String) -> KeyMsg {
        KeyMsg {
            key,
            uuid: self.uuid.clone(),
            owner: self.owner.clone(),
        }
    }

    fn namespace_msg(&self) -> NamespaceMsg {
        NamespaceMsg {
            uuid: self.uuid.clone(),
            owner: self.owner.clone(),
        }
    }

    fn key_value_msg(
        &self,
        key: &str,
        value: &str,
        lease: Lease,
    ) -> Result<KeyValueMsg, ValidationError> {
        let key = checked_key(key)?;
        let lease = lease.to_blocks()?;
        Ok(KeyValueMsg {
            key,
            value: encode_safe(value),
            uuid: self.uuid.clone(),
            owner: self.owner.clone(),
            lease,
        })
    }

    // ─── Mutations ───

    pub(crate) fn create(
        &self,
        key: &str,
        value: &str,
        lease: Lease,
    ) -> Result<Prepared, ValidationError> {
        let msg = self.key_value_msg(key, value, lease)?;
        Ok(Prepared::unmatched(Msg::Create(msg)))
    }

    pub(crate) fn update(
        &self,
        key: &str,
        value: &str,
        lease: Lease,
    ) -> Result<Prepared, ValidationError> {
        let msg = self.key_value_msg(key, value, lease)?;
        Ok(Prepared::unmatched(Msg::Update(msg)))
    }

    pub(crate) fn delete(&self, key: &str) -> Result<Prepared, ValidationError> {
        let key = checked_key(key)?;
        Ok(Prepared::unmatched(Msg::Delete(self.key_msg(key))))
    }

    pub(crate) fn delete_all(&self) -> Prepared {
        Prepared::unmatched(Msg::DeleteAll(self.namespace_msg()))
    }

    pub(crate) fn renew_lease(&self, key: &str, lease: Lease) -> Result<Prepared, ValidationError> {
        let key = checked_key(key)?;
        let lease = lease.to_blocks()?;
        Ok(Prepared::unmatched(Msg::RenewLease(RenewLeaseMsg {
            key,
            lease,
            uuid: self.uuid.clone(),
            owner: self.owner.clone(),
        })))
    }

    pub(crate) fn renew_lease_all(&self, lease: Lease) -> Result<Prepared, ValidationError> {
        let lease = lease.to_blocks()?;
        Ok(Prepared::unmatched(Msg::RenewLeaseAll(RenewLeaseAllMsg {
            lease,
            uuid: self.uuid.clone(),
            owner: self.owner.clone(),
        })))
    }

    pub(crate) fn multi_update(&self, key_values: &[KeyValue]) -> Result<Prepared, ValidationError> {
        let key_values = key_values
            .iter()
            .map(|kv| {
                Ok(KeyValuePair {
                    key: checked_key(&kv.key)?,
                    value: encode_safe(&kv.value),
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;
        Ok(Prepared::unmatched(Msg::MultiUpdate(MultiUpdateMsg {
            key_values,
            uuid: self.uuid.clone(),
            owner: self.owner.clone(),
        })))
    }

    /// Send `amount` BNT (in whole tokens) to `to_address`.
    pub(crate) fn transfer(&self, to_address: &str, amount: u64) -> Prepared {
        Prepared::unmatched(Msg::Send(SendMsg {
            from_address: self.owner.clone(),
            to_address: to_address.to_string(),
            amount: vec![Coin {
                amount: format!("{amount}000000"),
                denom: DENOM.to_string(),
            }],
        }))
    }

    // ─── Reads inside a transaction ───

    pub(crate) fn read(&self, key: &str) -> Result<Prepared, ValidationError> {
        let key = checked_key(key)?;
        let correlation = Correlation::KeyField {
            key: key.clone(),
            field: "value",
        };
        Ok(Prepared::new(Msg::Read(self.key_msg(key)), correlation))
    }

    pub(crate) fn has(&self, key: &str) -> Result<Prepared, ValidationError> {
        let key = checked_key(key)?;
        let correlation = Correlation::KeyField {
            key: key.clone(),
            field: "has",
        };
        Ok(Prepared::new(Msg::Has(self.key_msg(key)), correlation))
    }

    pub(crate) fn get_lease(&self, key: &str) -> Result<Prepared, ValidationError> {
        let key = checked_key(key)?;
        let correlation = Correlation::KeyField {
            key: key.clone(),
            field: "lease",
        };
        Ok(Prepared::new(Msg::GetLease(self.key_msg(key)), correlation))
    }

    pub(crate) fn count(&self) -> Prepared {
        Prepared::new(
            Msg::Count(self.namespace_msg()),
            Correlation::Field("count"),
        )
    }

    pub(crate) fn keys(&self) -> Prepared {
        Prepared::new(Msg::Keys(self.namespace_msg()), Correlation::Field("keys"))
    }

    pub(crate) fn key_values(&self) -> Prepared {
        Prepared::new(
            Msg::KeyValues(self.namespace_msg()),
            Correlation::Field("keyvalues"),
        )
    }

    pub(crate) fn get_n_shortest_leases(&self, n: u64) -> Prepared {
        Prepared::new(
            Msg::GetNShortestLeases(NShortestLeasesMsg {
                n,
                uuid: self.uuid.clone(),
                owner: self.owner.clone(),
            }),
            Correlation::Field("keyleases"),
        )
    }
}
