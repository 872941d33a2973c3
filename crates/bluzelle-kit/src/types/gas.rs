//! Gas and fee settings.

use serde::{Deserialize, Serialize};

/// Gas assumed for a message that does not set `max_gas`.
pub const DEFAULT_MAX_GAS: u64 = 200_000;

/// Gas price used when no message in a batch sets one, in `ubnt` per gas.
pub const DEFAULT_GAS_PRICE: f64 = 0.002;

/// Fee denomination of the chain.
pub const DENOM: &str = "ubnt";

/// Per-call gas settings.
///
/// # Example
///
/// ```
/// use bluzelle_kit::GasInfo;
///
/// let gas = GasInfo::default().max_gas(1_000_000).gas_price(10.0);
/// assert_eq!(gas.max_gas, Some(1_000_000));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GasInfo {
    pub max_gas: Option<u64>,
    pub max_fee: Option<u64>,
    pub gas_price: Option<f64>,
}

impl GasInfo {
    pub fn max_gas(mut self, gas: u64) -> Self {
        self.max_gas = Some(gas);
        self
    }

    pub fn max_fee(mut self, fee: u64) -> Self {
        self.max_fee = Some(fee);
        self
    }

    pub fn gas_price(mut self, price: f64) -> Self {
        self.gas_price = Some(price);
        self
    }
}

/// Gas limit and fee for one combined transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fee {
    pub gas: u64,
    pub amount: u64,
}

impl Fee {
    /// Combine the gas settings of every message in a batch.
    ///
    /// Gas limits add up. If any message sets `max_fee` the fees add up too;
    /// otherwise the fee is the gas limit times the highest gas price.
    pub fn combine<'a>(infos: impl IntoIterator<Item = &'a GasInfo>) -> Fee {
        let mut gas = 0u64;
        let mut max_fee: Option<u64> = None;
        let mut price: Option<f64> = None;

        for info in infos {
            gas = gas.saturating_add(info.max_gas.unwrap_or(DEFAULT_MAX_GAS));
            if let Some(fee) = info.max_fee {
                max_fee = Some(max_fee.unwrap_or(0).saturating_add(fee));
            }
            if let Some(p) = info.gas_price {
                price = Some(price.map_or(p, |current: f64| current.max(p)));
            }
        }

        let amount = match max_fee {
            Some(fee) => fee,
            None => (gas as f64 * price.unwrap_or(DEFAULT_GAS_PRICE)).ceil() as u64,
        };

        Fee { gas, amount }
    }
}
