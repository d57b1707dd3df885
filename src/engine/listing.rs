//! Listing lifecycle: creation, replacement, cancellation, and queries.

use tracing::{error, info};

use super::AuctionEngine;
use crate::error::{MarketError, MarketResult};
use crate::marketplace::{
    Auction, AuctionFilter, AuctionState, AuctionSummary, ItemPayload, PlayerId,
};
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
    /// Create a listing (or replace the caller's own bid-free listing of
    /// the same name).
    ///
    /// The item payload has already been taken into custody by the command
    /// layer; on replacement the previous payload goes back to the seller.
    /// On failure nothing is listed and the goods stay in custody — the
    /// command layer releases them back with its own copy of the handle.
    pub async fn set_auction(
        &self,
        seller: &PlayerId,
        name: &str,
        item: ItemPayload,
        start_price: u64,
        buyout_price: Option<u64>,
        hours: Option<u64>,
    ) -> MarketResult<Auction> {
        if !self.gate.is_open() {
            return Err(MarketError::GateClosed);
        }

        let duration_secs = match hours {
            Some(0) => {
                return Err(MarketError::Validation(
                    "duration must be at least one hour".into(),
                ))
            }
            Some(h) if h > self.config.max_duration_hours => {
                return Err(MarketError::Validation(format!(
                    "duration may not exceed {} hours",
                    self.config.max_duration_hours
                )))
            }
            Some(h) => h * 3600,
            None => self.config.default_duration_secs,
        };

        let build = |item: ItemPayload| {
            let mut builder = Auction::builder_with_time(&self.time)
                .name(name)
                .seller(seller.clone())
                .item(item)
                .start_price(start_price)
                .duration(duration_secs);
            if let Some(buyout) = buyout_price {
                builder = builder.buyout_price(buyout);
            }
            builder.build()
        };

        if let Some(record) = self.store.get(name).await {
            let (replacement, old_item) = {
                let mut guard = record.lock().await;
                if guard.state.is_terminal() {
                    // Settled between the index lookup and the lock; the
                    // name is free again.
                    drop(guard);
                    let auction = build(item)?;
                    self.store.insert(auction.clone()).await?;
                    info!("Listing '{}' created by {}", auction.name, seller);
                    return Ok(auction);
                }
                if guard.state != AuctionState::Open
                    || guard.has_bid()
                    || guard.seller != *seller
                {
                    return Err(MarketError::DuplicateName(guard.name.clone()));
                }
                let mut replacement = build(item)?;
                replacement.version = guard.version + 1;
                let old_item = guard.item.clone();
                self.store.commit(&mut guard, replacement.clone()).await?;
                (replacement, old_item)
            };

            if let Err(e) = self.custody.release(old_item, seller).await {
                error!(
                    "Failed to return replaced item for '{}' to {}: {}",
                    replacement.name, seller, e
                );
            }
            info!("Listing '{}' replaced by {}", replacement.name, seller);
            return Ok(replacement);
        }

        let auction = build(item)?;
        self.store.insert(auction.clone()).await?;
        info!(
            "Listing '{}' created by {} (start {}, buyout {:?})",
            auction.name, seller, auction.start_price, auction.buyout_price
        );
        Ok(auction)
    }

    /// Withdraw a listing. Only the seller (or an authorized override) may
    /// cancel, and only while no bid is recorded. Works while the gate is
    /// closed.
    pub async fn cancel(
        &self,
        requester: &PlayerId,
        name: &str,
        admin_override: bool,
    ) -> MarketResult<Auction> {
        let record = self
            .store
            .get(name)
            .await
            .ok_or_else(|| MarketError::NotFound(format!("no auction named '{name}'")))?;

        let (updated, was_pending) = {
            let mut guard = record.lock().await;
            if guard.state.is_terminal() {
                return Err(MarketError::NotFound(format!("no auction named '{name}'")));
            }
            if guard.seller != *requester && !admin_override {
                return Err(MarketError::PermissionDenied(
                    "only the seller may cancel this auction".into(),
                ));
            }
            if guard.has_bid() {
                return Err(MarketError::AuctionHasBids(guard.name.clone()));
            }
            let was_pending = guard.state == AuctionState::PendingBuyout;
            let mut updated = guard.clone();
            updated.state = AuctionState::Cancelled;
            updated.version += 1;
            self.store.commit_terminal(&mut guard, updated.clone()).await?;
            (updated, was_pending)
        };

        if was_pending {
            self.discard_token(&name_key(name)).await;
        }

        if let Err(e) = self
            .custody
            .release(updated.item.clone(), &updated.seller)
            .await
        {
            error!(
                "Failed to return item for cancelled '{}' to {}: {}",
                updated.name, updated.seller, e
            );
        }
        self.notifier
            .notify(
                &updated.seller,
                MarketEvent::AuctionCancelled {
                    auction: updated.name.clone(),
                },
            )
            .await;
        info!("Listing '{}' cancelled by {}", updated.name, requester);
        Ok(updated)
    }

    /// Active listings matching the filter, ordered by ascending deadline.
    pub async fn list_auctions(&self, filter: &AuctionFilter) -> Vec<AuctionSummary> {
        let mut summaries = Vec::new();
        for (_, record) in self.store.records().await {
            let guard = record.lock().await;
            if guard.state.is_terminal() {
                continue;
            }
            let keep = match filter {
                AuctionFilter::All => true,
                AuctionFilter::WithBuyout => guard.buyout_price.is_some(),
                AuctionFilter::OwnedBy(player) => guard.seller == *player,
            };
            if keep {
                summaries.push(AuctionSummary::from(&*guard));
            }
        }
        summaries.sort_by(|a, b| {
            a.expires_at
                .cmp(&b.expires_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        summaries
    }

    /// Names of all active listings, for completion prompts.
    pub async fn auction_names(&self) -> Vec<String> {
        self.collect_names(|_| true).await
    }

    /// Names of active listings that can be bought outright.
    pub async fn auction_names_with_buyout(&self) -> Vec<String> {
        self.collect_names(|a| a.buyout_price.is_some()).await
    }

    /// Names of active listings owned by one seller.
    pub async fn auction_names_owned_by(&self, player: &PlayerId) -> Vec<String> {
        let owner = player.clone();
        self.collect_names(move |a| a.seller == owner).await
    }

    async fn collect_names(&self, keep: impl Fn(&Auction) -> bool) -> Vec<String> {
        let mut names = Vec::new();
        for (_, record) in self.store.records().await {
            let guard = record.lock().await;
            if !guard.state.is_terminal() && keep(&guard) {
                names.push(guard.name.clone());
            }
        }
        names.sort();
        names
    }
}
