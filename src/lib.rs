//! Poolwatch keeps a local view of an oracle-priced constant-product
//! liquidity pool consistent with two independently-updating sources of
//! truth: on-chain ledger state reached over an async read interface, and
//! an off-chain price-oracle stream reached over a push subscription.
//!
//! Producer tasks (the ledger poller and the price stream) feed
//! latest-value cells; everything downstream (the derived exchange rate,
//! the approval gate, the liquidity quotes) is a pure function of those
//! cells plus user-entered amounts.

pub mod bootstrap;
pub mod config;
pub mod core;
pub mod data;
pub mod error;

pub use error::{PoolwatchError, Result};
