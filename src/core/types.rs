//! Core data types shared across the data and quote layers.
//!
//! This module defines the fundamental types used by the poller, the price
//! stream and the quote calculators, ensuring consistent representation of
//! ledger quantities and oracle observations.

use crate::error::{PoolwatchError, Result};
use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Immutable descriptor for a traded token. One instance per token,
/// built from configuration at process start and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Display name, e.g. "BRL".
    pub name: String,
    /// Ledger address of the token contract.
    pub address: String,
    /// Identifier of this token's oracle price feed.
    pub price_feed_id: String,
    /// Number of base-unit decimals.
    pub decimals: u32,
}

impl fmt::Display for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A non-negative token quantity in base units.
///
/// This is the only form in which amounts are exchanged with the ledger
/// interfaces. Conversions to display values go through `core::units` and
/// are lossy by design; a value headed back to the ledger never takes the
/// float path.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct RawQuantity(BigUint);

impl RawQuantity {
    pub fn zero() -> Self {
        RawQuantity(BigUint::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    /// Parse a base-10 integer string, the form quantities take on the
    /// RPC wire.
    pub fn from_dec_str(s: &str) -> Result<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PoolwatchError::InvalidFormat(s.to_string()));
        }
        BigUint::parse_bytes(s.as_bytes(), 10)
            .map(RawQuantity)
            .ok_or_else(|| PoolwatchError::InvalidFormat(s.to_string()))
    }

    /// Lossy conversion for display math. Quantities beyond double
    /// precision lose their low digits here.
    pub fn to_f64_lossy(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::INFINITY)
    }
}

impl From<BigUint> for RawQuantity {
    fn from(n: BigUint) -> Self {
        RawQuantity(n)
    }
}

impl From<u128> for RawQuantity {
    fn from(n: u128) -> Self {
        RawQuantity(BigUint::from(n))
    }
}

impl fmt::Display for RawQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Point-in-time aggregate of every ledger quantity the client tracks.
///
/// Produced wholesale by the poller and replaced atomically; consumers
/// never observe a mix of old and new fields. The cell holding it is
/// `None` while no wallet identity is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStateSnapshot {
    pub account_base_balance: RawQuantity,
    pub account_quote_balance: RawQuantity,
    pub pool_base_reserve: RawQuantity,
    pub pool_quote_reserve: RawQuantity,
    pub account_share_balance: RawQuantity,
    pub share_supply: RawQuantity,
}

/// Currently approved allowances for the pool contract, one per token.
///
/// Refreshed on the same cadence as the snapshot. Not globally monotonic:
/// an allowance can drop at any time through external revocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApprovalState {
    pub base: RawQuantity,
    pub quote: RawQuantity,
}

/// A single oracle price as published by the feed.
///
/// `price` is a fixed-point mantissa scaled by `10^expo`. Observations are
/// superseded per feed id by newer publish times and never merged across
/// ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub price: i64,
    pub expo: i32,
    /// Publish time in unix seconds.
    pub publish_time: i64,
}

impl PriceObservation {
    /// Display-scale numeric value of the observation.
    pub fn value(&self) -> f64 {
        self.price as f64 * 10f64.powi(self.expo)
    }
}

/// Cross rate between the base and quote tokens plus the freshness of the
/// inputs it was derived from. Recomputed wholesale, never patched.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRateMeta {
    /// Quote-denominated price of one base unit.
    pub rate: f64,
    /// Wall-clock time of the newer of the two input observations.
    pub last_updated: DateTime<Utc>,
}

/// Transient user-entered add-liquidity pair, kept mutually consistent
/// through the derived rate while editing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiquidityIntent {
    pub base: String,
    pub quote: String,
}
