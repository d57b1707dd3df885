//! Bid arbitration.
//!
//! Exactly one of any two racing bids wins per evaluation: validation and
//! commit happen under the record lock, the escrow reservation happens in
//! between with no lock held, and a version check on re-acquisition detects
//! interference. The loser's reservation never becomes live — it is
//! refunded before the error returns.

use tracing::{error, info};

use super::{AuctionEngine, Reservation};
use crate::error::{MarketError, MarketResult};
use crate::marketplace::{Auction, AuctionState, HighBid, PlayerId};
use crate::traits::{EconomyLedger, ItemCustody, KvStore, MarketEvent, Notifier, TimeProvider};
use crate::util::name_key;

impl<E, C, N, P, T> AuctionEngine<E, C, N, P, T>
where
    E: EconomyLedger,
    C: ItemCustody,
    N: Notifier,
    P: KvStore,
    T: TimeProvider,
{
    /// Place a bid. The offer must strictly exceed the current floor
    /// (start price or the standing high bid).
    ///
    /// Bidding never extends the deadline: expiry is fixed at creation.
    pub async fn bid(&self, bidder: &PlayerId, name: &str, offer: u64) -> MarketResult<Auction> {
        if !self.gate.is_open() {
            return Err(MarketError::GateClosed);
        }
        let record = self
            .store
            .get(name)
            .await
            .ok_or_else(|| MarketError::NotFound(format!("no auction named '{name}'")))?;
        let key = name_key(name);

        // Phase 1: validate and snapshot under the record lock.
        let version = {
            let mut guard = record.lock().await;
            self.ensure_open(&mut guard).await?;
            if guard.seller == *bidder {
                return Err(MarketError::Validation(
                    "you cannot bid on your own auction".into(),
                ));
            }
            let floor = guard.floor_price();
            if offer <= floor {
                return Err(MarketError::StateConflict(format!(
                    "bid must exceed {floor}"
                )));
            }
            guard.version
        };

        // Escrow the offer with no lock held: the economy collaborator may
        // re-enter the engine.
        let reservation = self.escrow.reserve(bidder, offer).await?;

        // Phase 2: re-acquire and commit. If a concurrent mutation moved
        // the record, re-validate once against the fresh state.
        let (updated, previous) = {
            let mut guard = record.lock().await;
            if guard.version != version
                && (guard.state != AuctionState::Open || offer <= guard.floor_price())
            {
                drop(guard);
                self.refund_quietly(reservation).await;
                return Err(MarketError::StateConflict(
                    "the auction changed while the bid was processed".into(),
                ));
            }
            let mut updated = guard.clone();
            updated.highest_bid = Some(HighBid {
                bidder: bidder.clone(),
                amount: offer,
            });
            updated.version += 1;
            if let Err(e) = self.store.commit(&mut guard, updated.clone()).await {
                drop(guard);
                self.refund_quietly(reservation).await;
                return Err(e);
            }
            let previous = self.escrow.swap_live(&key, reservation).await;
            (updated, previous)
        };

        info!("Bid of {} by {} accepted on '{}'", offer, bidder, updated.name);

        if let Some(previous) = previous {
            let outbid = previous.bidder.clone();
            self.refund_quietly(previous).await;
            self.notifier
                .notify(
                    &outbid,
                    MarketEvent::Outbid {
                        auction: updated.name.clone(),
                        new_amount: offer,
                    },
                )
                .await;
        }
        Ok(updated)
    }

    /// Release a reservation that must not stay held, logging instead of
    /// propagating: by the time this runs the caller's outcome is decided.
    pub(crate) async fn refund_quietly(&self, reservation: Reservation) {
        let bidder = reservation.bidder.clone();
        let amount = reservation.amount;
        if let Err(e) = self.escrow.refund(reservation).await {
            error!(
                "Failed to release escrow of {} held for {}: {}",
                amount, bidder, e
            );
        }
    }
}
