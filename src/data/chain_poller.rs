//! Fixed-interval ledger polling feeding the snapshot and approval cells.
//!
//! One background task owns both cells. Each tick issues the full batch
//! of reads, awaits it as a unit, and replaces the cells atomically only
//! when every read succeeded. A failed cycle is discarded wholesale: the
//! previous values stay published and the next tick retries at the fixed
//! cadence. There is no backoff.

use crate::core::types::{ApprovalState, ChainStateSnapshot, TokenConfig};
use crate::data::ledger::LedgerReader;
use crate::error::{PoolwatchError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

/// Receivers over the poller's cells plus control of its task.
///
/// Dropping the handle aborts the task, so no timer outlives its
/// configuration (identity change, pair change, teardown).
pub struct PollerHandle {
    pub snapshot: watch::Receiver<Option<ChainStateSnapshot>>,
    pub approvals: watch::Receiver<ApprovalState>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct ChainPoller {
    reader: Arc<dyn LedgerReader>,
    base_token: TokenConfig,
    quote_token: TokenConfig,
    pool_address: String,
    account: watch::Receiver<Option<String>>,
    snapshot_tx: watch::Sender<Option<ChainStateSnapshot>>,
    approvals_tx: watch::Sender<ApprovalState>,
    poll_interval: Duration,
}

impl ChainPoller {
    /// Spawn the refresh task and hand back its cells.
    ///
    /// The first cycle runs immediately; subsequent cycles run at the
    /// fixed interval. Polling proceeds with or without a wallet
    /// identity; a connect or disconnect triggers a cycle at once
    /// rather than waiting for the next tick.
    pub fn spawn(
        reader: Arc<dyn LedgerReader>,
        base_token: TokenConfig,
        quote_token: TokenConfig,
        pool_address: String,
        account: watch::Receiver<Option<String>>,
        poll_interval: Duration,
    ) -> PollerHandle {
        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let (approvals_tx, approvals_rx) = watch::channel(ApprovalState::default());
        let poller = Self {
            reader,
            base_token,
            quote_token,
            pool_address,
            account,
            snapshot_tx,
            approvals_tx,
            poll_interval,
        };
        let task = tokio::spawn(poller.run());
        PollerHandle {
            snapshot: snapshot_rx,
            approvals: approvals_rx,
            task,
        }
    }

    async fn run(mut self) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                // an identity change takes effect right away instead of
                // waiting out the current tick
                changed = self.account.changed() => {
                    if changed.is_err() {
                        // identity cell gone; nothing left to poll for
                        return;
                    }
                }
            }
            let account = self.account.borrow_and_update().clone();
            match account {
                None => {
                    // No identity: clear immediately. Ticking continues,
                    // so recovery needs no restart.
                    self.snapshot_tx.send_replace(None);
                    self.approvals_tx.send_replace(ApprovalState::default());
                }
                Some(account) => match self.read_cycle(&account).await {
                    Ok((snapshot, approvals)) => {
                        debug!(%account, "ledger state refreshed");
                        self.snapshot_tx.send_replace(Some(snapshot));
                        self.approvals_tx.send_replace(approvals);
                    }
                    Err(e) => {
                        // Cycle discarded; previous values stay published.
                        warn!(error = %e, "ledger read cycle failed; keeping previous snapshot");
                    }
                },
            }
        }
    }

    /// One batch of independent reads, awaited as a unit.
    ///
    /// The six snapshot reads and the two allowance reads share one
    /// cycle so both cells advance on the same cadence; a single failed
    /// read fails the whole cycle.
    async fn read_cycle(&self, account: &str) -> Result<(ChainStateSnapshot, ApprovalState)> {
        let reads = tokio::try_join!(
            self.reader.balance_of(&self.base_token.address, account),
            self.reader.balance_of(&self.quote_token.address, account),
            self.reader.pool_reserve_of(&self.base_token.address),
            self.reader.pool_reserve_of(&self.quote_token.address),
            self.reader.share_balance_of(account),
            self.reader.share_total_supply(),
            self.reader
                .allowance_of(&self.base_token.address, account, &self.pool_address),
            self.reader
                .allowance_of(&self.quote_token.address, account, &self.pool_address),
        );
        let (
            account_base_balance,
            account_quote_balance,
            pool_base_reserve,
            pool_quote_reserve,
            account_share_balance,
            share_supply,
            base_allowance,
            quote_allowance,
        ) = reads.map_err(|e| PoolwatchError::ReadCycle(e.to_string()))?;

        Ok((
            ChainStateSnapshot {
                account_base_balance,
                account_quote_balance,
                pool_base_reserve,
                pool_quote_reserve,
                account_share_balance,
                share_supply,
            },
            ApprovalState {
                base: base_allowance,
                quote: quote_allowance,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RawQuantity;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    /// Reader returning a fixed balance per call, with a switch that makes
    /// one specific read in the batch fail.
    struct ScriptedReader {
        balance: AtomicU64,
        fail_supply_read: AtomicBool,
    }

    impl ScriptedReader {
        fn new(balance: u64) -> Self {
            Self {
                balance: AtomicU64::new(balance),
                fail_supply_read: AtomicBool::new(false),
            }
        }

        fn quantity(&self) -> Result<RawQuantity> {
            Ok(RawQuantity::from(self.balance.load(Ordering::SeqCst) as u128))
        }
    }

    #[async_trait]
    impl LedgerReader for ScriptedReader {
        async fn balance_of(&self, _: &str, _: &str) -> Result<RawQuantity> {
            self.quantity()
        }

        async fn pool_reserve_of(&self, _: &str) -> Result<RawQuantity> {
            self.quantity()
        }

        async fn share_balance_of(&self, _: &str) -> Result<RawQuantity> {
            self.quantity()
        }

        async fn share_total_supply(&self) -> Result<RawQuantity> {
            if self.fail_supply_read.load(Ordering::SeqCst) {
                return Err(PoolwatchError::Rpc("supply read refused".into()));
            }
            self.quantity()
        }

        async fn allowance_of(&self, _: &str, _: &str, _: &str) -> Result<RawQuantity> {
            self.quantity()
        }
    }

    fn token(name: &str) -> TokenConfig {
        TokenConfig {
            name: name.to_string(),
            address: format!("0x{}", name),
            price_feed_id: format!("0xfeed{}", name),
            decimals: 6,
        }
    }

    fn spawn_with(
        reader: Arc<ScriptedReader>,
        account: Option<&str>,
    ) -> (PollerHandle, watch::Sender<Option<String>>) {
        let (account_tx, account_rx) = watch::channel(account.map(str::to_string));
        let handle = ChainPoller::spawn(
            reader,
            token("base"),
            token("quote"),
            "0xpool".to_string(),
            account_rx,
            Duration::from_secs(3),
        );
        (handle, account_tx)
    }

    /// Await cell updates until `predicate` holds for the current value.
    async fn wait_for<T: Clone>(
        rx: &mut watch::Receiver<T>,
        predicate: impl Fn(&T) -> bool,
    ) -> T {
        loop {
            {
                let current = rx.borrow_and_update();
                if predicate(&current) {
                    return current.clone();
                }
            }
            rx.changed().await.expect("poller task gone");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_cycle_keeps_previous_snapshot() {
        let reader = Arc::new(ScriptedReader::new(1_000));
        let (handle, _account_tx) = spawn_with(reader.clone(), Some("0xme"));
        let mut snapshot_rx = handle.snapshot.clone();

        // cycle 1 succeeds and publishes snapshot A
        let snapshot_a = wait_for(&mut snapshot_rx, Option::is_some).await.unwrap();
        assert_eq!(snapshot_a.share_supply, RawQuantity::from(1_000u128));

        // next cycles: one read in the batch fails; balances move underneath
        reader.balance.store(9_999, Ordering::SeqCst);
        reader.fail_supply_read.store(true, Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(7)).await;
        tokio::task::yield_now().await;
        assert_eq!(snapshot_rx.borrow().clone(), Some(snapshot_a));

        // the read recovers and the whole batch lands at once
        reader.fail_supply_read.store(false, Ordering::SeqCst);
        let snapshot_b = wait_for(&mut snapshot_rx, |snap| {
            snap.as_ref()
                .is_some_and(|s| s.share_supply == RawQuantity::from(9_999u128))
        })
        .await
        .unwrap();
        assert_eq!(
            snapshot_b.account_base_balance,
            RawQuantity::from(9_999u128)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_identity_clears_snapshot_and_recovers() {
        let reader = Arc::new(ScriptedReader::new(500));
        let (handle, account_tx) = spawn_with(reader, None);
        let mut snapshot_rx = handle.snapshot.clone();
        let mut approvals_rx = handle.approvals.clone();

        tokio::time::advance(Duration::from_secs(3)).await;
        tokio::task::yield_now().await;
        assert!(snapshot_rx.borrow().is_none());
        assert_eq!(*approvals_rx.borrow(), ApprovalState::default());

        // identity appears; the poller picks it up without restart
        account_tx.send(Some("0xme".to_string())).unwrap();
        wait_for(&mut snapshot_rx, Option::is_some).await;
        let approvals = wait_for(&mut approvals_rx, |a| !a.base.is_zero()).await;
        assert_eq!(approvals.base, RawQuantity::from(500u128));
    }

    #[tokio::test(start_paused = true)]
    async fn approvals_refresh_on_snapshot_cadence() {
        let reader = Arc::new(ScriptedReader::new(100));
        let (handle, _account_tx) = spawn_with(reader.clone(), Some("0xme"));
        let mut approvals_rx = handle.approvals.clone();

        let first = wait_for(&mut approvals_rx, |a| !a.quote.is_zero()).await;
        assert_eq!(first.quote, RawQuantity::from(100u128));

        reader.balance.store(250, Ordering::SeqCst);
        let next = wait_for(&mut approvals_rx, |a| {
            a.base == RawQuantity::from(250u128)
        })
        .await;
        assert_eq!(next.quote, RawQuantity::from(250u128));
    }
}
