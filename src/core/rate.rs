//! Exchange-rate derivation over the latest oracle observations.
//!
//! Derivation is a pure recompute: whenever the price map changes, the
//! whole `ExchangeRateMeta` is rebuilt from the two tracked feeds. If
//! either feed has not published yet the rate is unknown, and consumers
//! must propagate that rather than assume a default.

use crate::core::types::{ExchangeRateMeta, PriceObservation};
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Latest observation per oracle feed id.
pub type PriceMap = HashMap<String, PriceObservation>;

/// Recompute the cross rate from the latest observations.
///
/// Returns `None` until both feeds have published at least once, or when
/// the quote observation's value is zero (the rate would be unbounded).
/// The timestamp is the newer of the two publish times.
pub fn derive_rate(
    prices: &PriceMap,
    base_feed: &str,
    quote_feed: &str,
) -> Option<ExchangeRateMeta> {
    let base = prices.get(base_feed)?;
    let quote = prices.get(quote_feed)?;
    let quote_value = quote.value();
    if quote_value == 0.0 {
        return None;
    }
    let publish_time = base.publish_time.max(quote.publish_time);
    let last_updated = Utc.timestamp_opt(publish_time, 0).single()?;
    Some(ExchangeRateMeta {
        rate: base.value() / quote_value,
        last_updated,
    })
}

/// Handle over the derived-rate cell and the task keeping it current.
pub struct RateCellHandle {
    pub rate: watch::Receiver<Option<ExchangeRateMeta>>,
    task: JoinHandle<()>,
}

impl RateCellHandle {
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for RateCellHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Keep an exchange-rate cell in sync with the price-map cell.
///
/// The task recomputes on every upstream change and only publishes when
/// the derived value actually differs, so downstream `changed()` waiters
/// are not woken spuriously. It ends when the upstream sender goes away.
pub fn spawn_rate_cell(
    mut prices: watch::Receiver<PriceMap>,
    base_feed: String,
    quote_feed: String,
) -> RateCellHandle {
    let (tx, rx) = watch::channel(None);
    let task = tokio::spawn(async move {
        loop {
            let derived = derive_rate(&prices.borrow(), &base_feed, &quote_feed);
            tx.send_if_modified(|current| {
                if *current != derived {
                    *current = derived;
                    true
                } else {
                    false
                }
            });
            if prices.changed().await.is_err() {
                break;
            }
        }
    });
    RateCellHandle { rate: rx, task }
}
