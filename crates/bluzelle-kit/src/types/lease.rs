//! Lease durations and their conversion to block counts.

use crate::error::ValidationError;

/// Average block time of the chain, used to convert durations to blocks.
pub const BLOCK_TIME_IN_SECONDS: i64 = 5;

const MINUTE: i64 = 60;
const HOUR: i64 = MINUTE * 60;
const DAY: i64 = HOUR * 24;

/// How long a key should live.
///
/// All fields default to zero. A zero lease lets the chain apply its own
/// default.
///
/// # Example
///
/// ```
/// use bluzelle_kit::Lease;
///
/// let lease = Lease::days(1).and_hours(12);
/// assert_eq!(lease.to_blocks().unwrap(), 25_920);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Lease {
    pub seconds: i64,
    pub minutes: i64,
    pub hours: i64,
    pub days: i64,
}

impl Lease {
    /// No explicit lease.
    pub const ZERO: Lease = Lease {
        seconds: 0,
        minutes: 0,
        hours: 0,
        days: 0,
    };

    /// A lease of `n` seconds.
    pub fn seconds(n: i64) -> Self {
        Self {
            seconds: n,
            ..Self::ZERO
        }
    }

    /// A lease of `n` minutes.
    pub fn minutes(n: i64) -> Self {
        Self {
            minutes: n,
            ..Self::ZERO
        }
    }

    /// A lease of `n` hours.
    pub fn hours(n: i64) -> Self {
        Self {
            hours: n,
            ..Self::ZERO
        }
    }

    /// A lease of `n` days.
    pub fn days(n: i64) -> Self {
        Self {
            days: n,
            ..Self::ZERO
        }
    }

    pub fn and_seconds(mut self, n: i64) -> Self {
        self.seconds = n;
        self
    }

    pub fn and_minutes(mut self, n: i64) -> Self {
        self.minutes = n;
        self
    }

    pub fn and_hours(mut self, n: i64) -> Self {
        self.hours = n;
        self
    }

    pub fn and_days(mut self, n: i64) -> Self {
        self.days = n;
        self
    }

    /// Total duration in seconds, or `None` on overflow.
    pub fn total_seconds(&self) -> Option<i64> {
        self.minutes
            .checked_mul(MINUTE)?
            .checked_add(self.hours.checked_mul(HOUR)?)?
            .checked_add(self.days.checked_mul(DAY)?)?
            .checked_add(self.seconds)
    }

    /// Convert to a block count, rounding partial blocks up.
    ///
    /// Fails with [`ValidationError::InvalidLeaseTime`] when the result is
    /// negative. A negative total that rounds up to zero blocks is accepted.
    pub fn to_blocks(&self) -> Result<u64, ValidationError> {
        let total = self
            .total_seconds()
            .ok_or(ValidationError::InvalidLeaseTime)?;
        let blocks = ceil_div(total, BLOCK_TIME_IN_SECONDS);
        u64::try_from(blocks).map_err(|_| ValidationError::InvalidLeaseTime)
    }
}

/// Convert a block count reported by the chain back to seconds.
pub fn blocks_to_seconds(blocks: u64) -> u64 {
    blocks.saturating_mul(BLOCK_TIME_IN_SECONDS as u64)
}

fn ceil_div(n: i64, d: i64) -> i64 {
    let q = n.div_euclid(d);
    if n.rem_euclid(d) != 0 { q + 1 } else { q }
}
