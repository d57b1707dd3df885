//! Player notification abstraction.

use async_trait::async_trait;

use crate::marketplace::PlayerId;

/// Marketplace events surfaced to players.
///
/// Rendering (chat formatting, localization) belongs to the command layer;
/// the engine only names what happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketEvent {
    /// A higher bid replaced the player's bid; their escrow was refunded.
    Outbid { auction: String, new_amount: u64 },
    /// The player's escrow was refunded because the auction resolved
    /// without them (buyout by someone else, for example).
    BidRefunded { auction: String, amount: u64 },
    /// The player won the auction and received the item.
    AuctionWon { auction: String, amount: u64 },
    /// The player's listing sold; proceeds were deposited.
    AuctionSold { auction: String, amount: u64 },
    /// The player's listing expired with no bids; the item was returned.
    AuctionExpired { auction: String },
    /// A buyout confirmation window opened on the player's listing.
    BuyoutPending { auction: String, requester: PlayerId },
    /// The listing was cancelled and the item returned.
    AuctionCancelled { auction: String },
}

/// Abstraction over the server's messaging channel.
///
/// Delivery is fire-and-forget: a player being offline must never fail a
/// marketplace operation, so implementations swallow and log their own
/// errors.
#[async_trait]
pub trait Notifier: Send + Sync + Clone {
    async fn notify(&self, player: &PlayerId, event: MarketEvent);
}
