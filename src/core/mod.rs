//! Pure state and quote logic.
//!
//! Everything here is a deterministic function of its inputs: the codec,
//! the rate derivation, the approval gate and the quote calculators. The
//! producing tasks that feed these live under `crate::data`.

pub mod authorization;
pub mod quote;
pub mod rate;
pub mod types;
pub mod units;

// Re-export the types consumers touch on every read for ergonomic access
// from downstream code.
pub use types::{
    ApprovalState, ChainStateSnapshot, ExchangeRateMeta, LiquidityIntent, PriceObservation,
    RawQuantity, TokenConfig,
};
