//! Process wiring: configuration to running tasks.
//!
//! Builds the ledger client, spawns the poller and the price stream,
//! derives the rate cell and then follows the cells, logging the evolving
//! view. Rendering is out of scope; this is the reference consumer of the
//! state layer.

use crate::config;
use crate::core::rate::spawn_rate_cell;
use crate::core::units::raw_to_decimal;
use crate::data::chain_poller::ChainPoller;
use crate::data::ledger::RpcLedgerClient;
use crate::data::price_stream::PriceStream;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

pub async fn bootstrap() -> anyhow::Result<()> {
    let cfg = config::load_base()?;
    info!(
        base = %cfg.base_token,
        quote = %cfg.quote_token,
        pool = %cfg.pool.contract_address,
        "starting poolwatch"
    );

    // The wallet identity cell. A connection flow would feed this; here it
    // is seeded from configuration and left static.
    let (_account_tx, account_rx) = watch::channel(cfg.ledger.account.clone());

    let ledger = Arc::new(RpcLedgerClient::new(
        cfg.ledger.rpc_url.clone(),
        cfg.pool.contract_address.clone(),
    ));

    let poller = ChainPoller::spawn(
        ledger,
        cfg.base_token.clone(),
        cfg.quote_token.clone(),
        cfg.pool.contract_address.clone(),
        account_rx,
        Duration::from_secs(cfg.ledger.poll_interval_secs),
    );

    let stream = PriceStream::spawn(
        cfg.price_service.url.clone(),
        vec![
            cfg.base_token.price_feed_id.clone(),
            cfg.quote_token.price_feed_id.clone(),
        ],
    );

    let rate_cell = spawn_rate_cell(
        stream.prices.clone(),
        cfg.base_token.price_feed_id.clone(),
        cfg.quote_token.price_feed_id.clone(),
    );

    let mut snapshot_rx = poller.snapshot.clone();
    let mut rate_rx = rate_cell.rate.clone();

    loop {
        tokio::select! {
            changed = snapshot_rx.changed() => {
                changed?;
                match snapshot_rx.borrow().as_ref() {
                    Some(snapshot) => info!(
                        account_base = raw_to_decimal(
                            &snapshot.account_base_balance, cfg.base_token.decimals),
                        account_quote = raw_to_decimal(
                            &snapshot.account_quote_balance, cfg.quote_token.decimals),
                        pool_base = raw_to_decimal(
                            &snapshot.pool_base_reserve, cfg.base_token.decimals),
                        pool_quote = raw_to_decimal(
                            &snapshot.pool_quote_reserve, cfg.quote_token.decimals),
                        share_supply = raw_to_decimal(
                            &snapshot.share_supply, cfg.base_token.decimals),
                        "chain state refreshed"
                    ),
                    None => info!("chain state cleared: no wallet identity"),
                }
            }
            changed = rate_rx.changed() => {
                changed?;
                match rate_rx.borrow().as_ref() {
                    Some(meta) => info!(
                        rate = meta.rate,
                        updated = %meta.last_updated,
                        "exchange rate derived"
                    ),
                    None => info!("exchange rate unavailable: waiting for both feeds"),
                }
            }
        }
    }
}
