//! Two-phase buyout: request a confirmation window, then confirm within
//! its TTL. The window keeps an accidental click from being an irreversible
//! purchase; expiry is implicit and the auction reopens on detection.

use tracing::{error, info};

use super::AuctionEngine;
use crate::error::{MarketError, MarketResult};
use crate::marketplace::{Auction, AuctionState, PendingBuyout, PlayerId};
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
    /// Open (or re-open) a buyout confirmation window on a listing.
    ///
    /// A repeat request before the previous window closes replaces the
    /// token without changing auction state, so the latest requester holds
    /// the only confirmation right.
    pub async fn buyout_request(
        &self,
        sender: &PlayerId,
        name: &str,
    ) -> MarketResult<PendingBuyout> {
        if !self.gate.is_open() {
            return Err(MarketError::GateClosed);
        }
        let record = self
            .store
            .get(name)
            .await
            .ok_or_else(|| MarketError::NotFound(format!("no auction named '{name}'")))?;
        let key = name_key(name);
        let now = self.time.now_unix();

        let (token, seller) = {
            let mut guard = record.lock().await;
            if guard.state.is_terminal() {
                return Err(MarketError::NotFound(format!("no auction named '{name}'")));
            }
            if guard.buyout_price.is_none() {
                return Err(MarketError::StateConflict(
                    "this auction has no buyout price".into(),
                ));
            }
            if guard.seller == *sender {
                return Err(MarketError::Validation(
                    "you cannot buy out your own auction".into(),
                ));
            }

            let token =
                PendingBuyout::new(key.clone(), sender.clone(), now, self.config.buyout_ttl_secs);
            match guard.state {
                AuctionState::Open => {
                    self.persist_token(&token).await?;
                    let mut updated = guard.clone();
                    updated.state = AuctionState::PendingBuyout;
                    updated.version += 1;
                    if let Err(e) = self.store.commit(&mut guard, updated).await {
                        // Roll the token record back; memory is untouched.
                        self.discard_token(&key).await;
                        return Err(e);
                    }
                    self.tokens.put(token.clone()).await;
                    (token, Some(guard.seller.clone()))
                }
                AuctionState::PendingBuyout => {
                    // Replace the token (live or lapsed); state unchanged.
                    self.persist_token(&token).await?;
                    self.tokens.put(token.clone()).await;
                    (token, None)
                }
                // Terminal states were handled above.
                _ => unreachable!("non-terminal state expected"),
            }
        };

        info!(
            "Buyout window on '{}' opened for {} (expires {})",
            key, sender, token.expires_at
        );
        if let Some(seller) = seller {
            self.notifier
                .notify(
                    &seller,
                    MarketEvent::BuyoutPending {
                        auction: name.to_string(),
                        requester: sender.clone(),
                    },
                )
                .await;
        }
        Ok(token)
    }

    /// Finalize an outright purchase within the confirmation window.
    ///
    /// Only the player who requested the window may confirm; a lapsed
    /// window reopens the auction and reports `ExpiredConfirmation`.
    pub async fn buyout_confirm(&self, buyer: &PlayerId, name: &str) -> MarketResult<Auction> {
        let record = self
            .store
            .get(name)
            .await
            .ok_or_else(|| MarketError::NotFound(format!("no auction named '{name}'")))?;
        let key = name_key(name);
        let now = self.time.now_unix();

        // Phase 1: validate the window and snapshot under the record lock.
        let (price, version) = {
            let mut guard = record.lock().await;
            if guard.state != AuctionState::PendingBuyout {
                return Err(MarketError::StateConflict(
                    "no buyout is pending on this auction".into(),
                ));
            }
            let Some(token) = self.tokens.get(&key).await else {
                // State says pending but the token is gone; reopen.
                self.revert_to_open(&mut guard).await?;
                return Err(MarketError::StateConflict(
                    "no buyout is pending on this auction".into(),
                ));
            };
            if token.is_expired_at(now) {
                self.revert_to_open(&mut guard).await?;
                return Err(MarketError::ExpiredConfirmation);
            }
            if token.requester != *buyer {
                return Err(MarketError::WrongRequester);
            }
            let price = guard.buyout_price.ok_or_else(|| {
                MarketError::StateConflict("this auction has no buyout price".into())
            })?;
            (price, guard.version)
        };

        // Escrow the buyout price with no lock held. On refusal the window
        // stays open; the buyer may retry while the token lives.
        let reservation = self.escrow.reserve(buyer, price).await?;

        // Phase 2: re-acquire and commit the sale.
        let (updated, previous) = {
            let mut guard = record.lock().await;
            let token_still_ours = match self.tokens.get(&key).await {
                Some(t) => t.requester == *buyer && !t.is_expired_at(self.time.now_unix()),
                None => false,
            };
            if guard.version != version
                || guard.state != AuctionState::PendingBuyout
                || !token_still_ours
            {
                drop(guard);
                self.refund_quietly(reservation).await;
                return Err(MarketError::StateConflict(
                    "the auction changed while the buyout was processed".into(),
                ));
            }
            let mut updated = guard.clone();
            updated.state = AuctionState::Sold;
            updated.version += 1;
            if let Err(e) = self.store.commit_terminal(&mut guard, updated.clone()).await {
                drop(guard);
                self.refund_quietly(reservation).await;
                return Err(e);
            }
            let previous = self.escrow.take_live(&key).await;
            (updated, previous)
        };
        self.discard_token(&key).await;

        // External effects after the committed terminal state: each runs
        // exactly once because `Sold` is never left.
        if let Some(previous) = previous {
            let refunded = previous.bidder.clone();
            let amount = previous.amount;
            self.refund_quietly(previous).await;
            self.notifier
                .notify(
                    &refunded,
                    MarketEvent::BidRefunded {
                        auction: updated.name.clone(),
                        amount,
                    },
                )
                .await;
        }
        if let Err(e) = self.escrow.payout(reservation, &updated.seller).await {
            error!(
                "Failed to pay out buyout of '{}' to {}: {}",
                updated.name, updated.seller, e
            );
        }
        if let Err(e) = self.custody.release(updated.item.clone(), buyer).await {
            error!(
                "Failed to deliver item of '{}' to {}: {}",
                updated.name, buyer, e
            );
        }
        self.notifier
            .notify(
                &updated.seller,
                MarketEvent::AuctionSold {
                    auction: updated.name.clone(),
                    amount: price,
                },
            )
            .await;
        self.notifier
            .notify(
                buyer,
                MarketEvent::AuctionWon {
                    auction: updated.name.clone(),
                    amount: price,
                },
            )
            .await;

        info!("'{}' bought out by {} for {}", updated.name, buyer, price);
        Ok(updated)
    }
}
