//! Producer tasks and external-interface plumbing.
//!
//! Each submodule encapsulates one source of truth: the ledger RPC
//! interfaces, the fixed-interval chain poller and the push-based price
//! stream. Both producers feed latest-value cells; once a value lands in
//! a cell, consumers cannot tell polled data from pushed data.

pub mod chain_poller;
pub mod ledger;
pub mod price_stream;

pub use chain_poller::{ChainPoller, PollerHandle};
pub use ledger::{LedgerReader, LedgerWriter, RpcLedgerClient};
pub use price_stream::{PriceStream, PriceStreamHandle};
