//! Off-chain price feed subscription and per-feed aggregation.
//!
//! One long-lived WebSocket subscription is opened for the configured
//! feed ids when the stream is spawned and lives for the life of the
//! handle; it is never re-opened per refresh. Each inbound update lands
//! in exactly one feed's slot of the aggregate map, leaving all others
//! untouched. Downstream readers must tolerate either feed being absent
//! before its first push.
//!
//! The prices are consumed as published, without a staleness check:
//! recency is already bounded by the push transport. This is a
//! deliberate trust boundary, not an omission.

use crate::core::rate::PriceMap;
use crate::core::types::PriceObservation;
use crate::error::Result;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, info, warn};
use url::Url;

const INITIAL_RECONNECT_DELAY: Duration = Duration::from_secs(1);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60);

/// Incoming service message. Anything that is not a price update
/// (subscription acks, heartbeats) is ignored.
#[derive(Debug, Deserialize)]
struct StreamMessage {
    #[serde(rename = "type")]
    kind: String,
    price_feed: Option<FeedEnvelope>,
}

#[derive(Debug, Deserialize)]
struct FeedEnvelope {
    id: String,
    price: WirePrice,
}

/// Price payload as it appears on the wire: a string mantissa with an
/// exponent and the feed's publish time.
#[derive(Debug, Deserialize)]
struct WirePrice {
    price: String,
    expo: i32,
    publish_time: i64,
}

/// Receiver over the aggregate price cell plus control of the
/// subscription task. Dropping the handle closes the subscription.
pub struct PriceStreamHandle {
    pub prices: watch::Receiver<PriceMap>,
    task: JoinHandle<()>,
}

impl PriceStreamHandle {
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for PriceStreamHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct PriceStream;

impl PriceStream {
    /// Open the subscription for `feed_ids` and start the merge task.
    ///
    /// Transport loss is retried with bounded exponential backoff and a
    /// fresh subscribe message; the last published observations stay in
    /// the cell across reconnects.
    pub fn spawn(service_url: String, feed_ids: Vec<String>) -> PriceStreamHandle {
        let (tx, rx) = watch::channel(PriceMap::new());
        let task = tokio::spawn(run_subscription(service_url, feed_ids, tx));
        PriceStreamHandle { prices: rx, task }
    }
}

async fn run_subscription(
    service_url: String,
    feed_ids: Vec<String>,
    tx: watch::Sender<PriceMap>,
) {
    let mut delay = INITIAL_RECONNECT_DELAY;
    loop {
        match connect_and_stream(&service_url, &feed_ids, &tx).await {
            Ok(()) => {
                // Server closed the stream; resubscribe promptly.
                delay = INITIAL_RECONNECT_DELAY;
                warn!("price stream closed by server; resubscribing");
            }
            Err(e) => {
                warn!(error = %e, "price stream failed; reconnecting");
            }
        }
        sleep(delay).await;
        delay = (delay * 2).min(MAX_RECONNECT_DELAY);
    }
}

async fn connect_and_stream(
    service_url: &str,
    feed_ids: &[String],
    tx: &watch::Sender<PriceMap>,
) -> Result<()> {
    let url = Url::parse(service_url)?;
    let (mut ws, _) = connect_async(url).await?;

    let subscribe = json!({ "type": "subscribe", "ids": feed_ids });
    ws.send(Message::Text(subscribe.to_string())).await?;
    info!(feeds = feed_ids.len(), "price subscription open");

    while let Some(message) = ws.next().await {
        match message? {
            Message::Text(text) => {
                if let Some((id, observation)) = parse_update(&text) {
                    apply_update(tx, id, observation);
                } else {
                    debug!("ignoring non-update stream message");
                }
            }
            Message::Close(_) => break,
            // tungstenite answers pings itself; nothing to track here
            _ => {}
        }
    }
    Ok(())
}

/// Extract a feed update from a raw frame, or `None` for any other
/// message shape.
fn parse_update(text: &str) -> Option<(String, PriceObservation)> {
    let message: StreamMessage = serde_json::from_str(text).ok()?;
    if message.kind != "price_update" {
        return None;
    }
    let feed = message.price_feed?;
    let price = feed.price.price.parse::<i64>().ok()?;
    Some((
        feed.id,
        PriceObservation {
            price,
            expo: feed.price.expo,
            publish_time: feed.price.publish_time,
        },
    ))
}

/// Merge one observation into the aggregate map.
///
/// Only the updated feed's entry changes. An observation older than the
/// one already held is dropped so a delayed frame cannot roll a feed
/// backwards.
fn apply_update(tx: &watch::Sender<PriceMap>, id: String, observation: PriceObservation) {
    tx.send_modify(|map| match map.get(&id) {
        Some(previous) if previous.publish_time > observation.publish_time => {
            debug!(feed = %id, "dropping stale price push");
        }
        _ => {
            map.insert(id, observation);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(price: i64, publish_time: i64) -> PriceObservation {
        PriceObservation {
            price,
            expo: -8,
            publish_time,
        }
    }

    #[test]
    fn parses_price_update_frames() {
        let raw = r#"{
            "type": "price_update",
            "price_feed": {
                "id": "0xfeedbase",
                "price": { "price": "7423155000", "expo": -8, "publish_time": 1700000000 }
            }
        }"#;
        let (id, observation) = parse_update(raw).unwrap();
        assert_eq!(id, "0xfeedbase");
        assert_eq!(observation.price, 7_423_155_000);
        assert_eq!(observation.expo, -8);
        assert_eq!(observation.publish_time, 1_700_000_000);
    }

    #[test]
    fn ignores_other_frames() {
        assert!(parse_update(r#"{"type":"response","status":"success"}"#).is_none());
        assert!(parse_update("not json").is_none());
        assert!(parse_update(r#"{"type":"price_update"}"#).is_none());
    }

    #[test]
    fn updates_merge_per_feed() {
        let (tx, rx) = watch::channel(PriceMap::new());

        apply_update(&tx, "base".into(), obs(100, 10));
        apply_update(&tx, "quote".into(), obs(200, 11));
        assert_eq!(rx.borrow().len(), 2);

        // a base update leaves quote untouched
        apply_update(&tx, "base".into(), obs(150, 12));
        let map = rx.borrow();
        assert_eq!(map["base"].price, 150);
        assert_eq!(map["quote"].price, 200);
    }

    #[test]
    fn stale_push_does_not_roll_a_feed_backwards() {
        let (tx, rx) = watch::channel(PriceMap::new());

        apply_update(&tx, "base".into(), obs(100, 20));
        apply_update(&tx, "base".into(), obs(90, 15));
        assert_eq!(rx.borrow()["base"].price, 100);

        // an equal publish time still replaces
        apply_update(&tx, "base".into(), obs(95, 20));
        assert_eq!(rx.borrow()["base"].price, 95);
    }
}
