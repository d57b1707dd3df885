//! Background expiry monitoring and settlement.
//!
//! A cooperative polling loop: each pass sweeps lapsed buyout windows
//! (reverting their auctions to open, re-evaluated in the same pass) and
//! then settles every open listing past its deadline. Settlement commits
//! under the record lock with an optimistic version check, so a racing bid
//! or buyout either lands before the commit or fails its own version
//! check — a listing is never settled twice.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use super::AuctionEngine;
use crate::error::MarketResult;
use crate::marketplace::AuctionState;
use crate::traits::{EconomyLedger, ItemCustody, KvStore, MarketEvent, Notifier, TimeProvider};

impl<E, C, N, P, T> AuctionEngine<E, C, N, P, T>
where
    E: EconomyLedger + 'static,
    C: ItemCustody + 'static,
    N: Notifier + 'static,
    P: KvStore + 'static,
    T: TimeProvider + 'static,
{
    /// Start background expiry monitoring.
    ///
    /// The task polls at the configured period until
    /// [`shutdown`](Self::shutdown) cancels it.
    pub fn start_scheduler(self: Arc<Self>) {
        info!("Starting auction expiry scheduler");
        let engine = self.clone();
        let token = self.shutdown.clone();
        let period = Duration::from_secs(self.config.poll_interval_secs);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = token.cancelled() => {
                        info!("Expiry scheduler shutting down");
                        break;
                    }
                    () = tokio::time::sleep(period) => {}
                }
                engine.run_expiry_pass().await;
            }
        });

        // Store the handle for potential awaiting on shutdown
        if let Ok(mut guard) = self.scheduler_handle.lock() {
            *guard = Some(handle);
        }
    }
}

impl<E, C, N, P, T> AuctionEngine<E, C, N, P, T>
where
    E: EconomyLedger,
    C: ItemCustody,
    N: Notifier,
    P: KvStore,
    T: TimeProvider,
{
    /// One scheduler pass: sweep lapsed buyout windows, then settle every
    /// listing past its deadline. Public so hosts and tests can drive
    /// settlement deterministically without waiting on the timer.
    pub async fn run_expiry_pass(&self) {
        let now = self.time.now_unix();
        self.sweep_lapsed_windows(now).await;
        self.settle_due(now).await;
    }

    /// Revert every `PendingBuyout` listing whose token lapsed (or
    /// vanished) back to `Open`.
    async fn sweep_lapsed_windows(&self, now: u64) {
        for token in self.tokens.drain_expired(now).await {
            let Some(record) = self.store.get(&token.auction).await else {
                continue;
            };
            let mut guard = record.lock().await;
            if guard.state != AuctionState::PendingBuyout {
                continue;
            }
            // A fresh window may have been issued since the drain.
            if let Some(current) = self.tokens.get(&token.auction).await {
                if !current.is_expired_at(now) {
                    continue;
                }
            }
            if let Err(e) = self.revert_to_open(&mut guard).await {
                warn!(
                    "Failed to reopen '{}' after lapsed buyout window: {} (will retry)",
                    token.auction, e
                );
            }
        }

        // Pending listings with no token at all (e.g. a crash between the
        // token write and the state commit) reopen here too.
        for (key, record) in self.store.records().await {
            let mut guard = record.lock().await;
            if guard.state == AuctionState::PendingBuyout
                && self.tokens.get(&key).await.is_none()
            {
                if let Err(e) = self.revert_to_open(&mut guard).await {
                    warn!("Failed to reopen tokenless '{}': {} (will retry)", key, e);
                }
            }
        }
    }

    /// Settle every open listing past its deadline.
    async fn settle_due(&self, now: u64) {
        let mut due = Vec::new();
        for (key, record) in self.store.records().await {
            let guard = record.lock().await;
            if guard.state == AuctionState::Open && guard.is_expired_at(now) {
                due.push((key, guard.version));
            }
        }

        for (key, version) in due {
            if let Err(e) = self.settle_one(&key, version).await {
                error!("Failed to settle '{}': {} (will retry)", key, e);
            }
        }
    }

    /// Settle one due listing if its version is still the one observed at
    /// collection time. A moved version means a bid or buyout interfered;
    /// the next pass re-evaluates from fresh state.
    async fn settle_one(&self, key: &str, expected_version: u64) -> MarketResult<()> {
        let Some(record) = self.store.get(key).await else {
            return Ok(());
        };

        let (updated, reservation) = {
            let mut guard = record.lock().await;
            if guard.version != expected_version || guard.state != AuctionState::Open {
                return Ok(());
            }
            let mut updated = guard.clone();
            updated.state = if updated.has_bid() {
                AuctionState::Sold
            } else {
                AuctionState::ExpiredUnsold
            };
            updated.version += 1;
            self.store.commit_terminal(&mut guard, updated.clone()).await?;
            let reservation = self.escrow.take_live(key).await;
            (updated, reservation)
        };

        // External effects after the committed terminal state.
        match (&updated.highest_bid, reservation) {
            (Some(high), Some(reservation)) => {
                info!(
                    "Auction '{}' settled: sold to {} for {}",
                    updated.name, high.bidder, high.amount
                );
                if let Err(e) = self.escrow.payout(reservation, &updated.seller).await {
                    error!(
                        "Failed to pay out '{}' to {}: {}",
                        updated.name, updated.seller, e
                    );
                }
                if let Err(e) = self.custody.release(updated.item.clone(), &high.bidder).await {
                    error!(
                        "Failed to deliver item of '{}' to {}: {}",
                        updated.name, high.bidder, e
                    );
                }
                self.notifier
                    .notify(
                        &updated.seller,
                        MarketEvent::AuctionSold {
                            auction: updated.name.clone(),
                            amount: high.amount,
                        },
                    )
                    .await;
                self.notifier
                    .notify(
                        &high.bidder,
                        MarketEvent::AuctionWon {
                            auction: updated.name.clone(),
                            amount: high.amount,
                        },
                    )
                    .await;
            }
            (Some(high), None) => {
                // The ledger and the record disagree; nothing safe to move.
                error!(
                    "No escrow held for settled '{}' (high bid {} by {})",
                    updated.name, high.amount, high.bidder
                );
            }
            (None, _) => {
                info!("Auction '{}' expired unsold", updated.name);
                if let Err(e) = self
                    .custody
                    .release(updated.item.clone(), &updated.seller)
                    .await
                {
                    error!(
                        "Failed to return item of '{}' to {}: {}",
                        updated.name, updated.seller, e
                    );
                }
                self.notifier
                    .notify(
                        &updated.seller,
                        MarketEvent::AuctionExpired {
                            auction: updated.name.clone(),
                        },
                    )
                    .await;
            }
        }
        Ok(())
    }
}
