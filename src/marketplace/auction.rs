use serde::{Deserialize, Serialize};

use crate::config::MAX_RECORD_SIZE;
use crate::error::{MarketError, MarketResult};
use crate::marketplace::{ItemPayload, PlayerId};
use crate::traits::{SystemTimeProvider, TimeProvider};
use crate::util::{cbor_from_limited_reader, to_cbor};

/// Longest name a seller may give a listing.
pub const MAX_NAME_LEN: usize = 48;

/// Lifecycle state of a listing.
///
/// `Sold`, `ExpiredUnsold`, and `Cancelled` are terminal: once reached, a
/// record never leaves them and its name becomes available for reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionState {
    /// Accepting bids (and buyout requests, when a buyout price is set).
    Open,
    /// A buyout confirmation window is open; reverts to `Open` on expiry.
    PendingBuyout,
    /// Settled to a buyer.
    Sold,
    /// Deadline passed with no bid; item returned to the seller.
    ExpiredUnsold,
    /// Withdrawn by the seller (or an override) before any bid.
    Cancelled,
}

impl AuctionState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Sold | Self::ExpiredUnsold | Self::Cancelled)
    }
}

/// The current winning bid. Escrow for exactly this amount is held against
/// the bidder until they are outbid or the auction settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighBid {
    pub bidder: PlayerId,
    pub amount: u64,
}

/// A marketplace listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Auction {
    /// Human-chosen identifier, unique among non-terminal listings
    /// (case-insensitive). Display casing is preserved.
    pub name: String,

    /// The listing player.
    pub seller: PlayerId,

    /// Goods under custody, released on settlement.
    pub item: ItemPayload,

    /// Initial minimum bid, in atomic currency units. Always positive.
    pub start_price: u64,

    /// Outright purchase price; when set, strictly greater than
    /// `start_price` and immutable after creation.
    pub buyout_price: Option<u64>,

    /// Unix timestamp when the listing was created.
    pub created_at: u64,

    /// Unix timestamp when the auction settles.
    pub expires_at: u64,

    /// Current winning bid, strictly increasing across accepted bids.
    pub highest_bid: Option<HighBid>,

    /// Lifecycle state.
    pub state: AuctionState,

    /// Bumped on every mutation; the scheduler's optimistic-check token.
    pub version: u64,
}

impl Auction {
    /// Create a new auction builder.
    pub const fn builder() -> AuctionBuilder<SystemTimeProvider> {
        AuctionBuilder::new(SystemTimeProvider::new())
    }

    /// Create a new auction builder with a custom time provider.
    pub const fn builder_with_time<T: TimeProvider>(time: T) -> AuctionBuilder<T> {
        AuctionBuilder::new(time)
    }

    /// Whether a bid has been recorded.
    pub const fn has_bid(&self) -> bool {
        self.highest_bid.is_some()
    }

    /// The amount a new bid must strictly exceed.
    pub fn floor_price(&self) -> u64 {
        match &self.highest_bid {
            Some(high) => high.amount.max(self.start_price),
            None => self.start_price,
        }
    }

    /// Price a listing would currently fetch: the high bid, else the start.
    pub fn current_price(&self) -> u64 {
        self.highest_bid
            .as_ref()
            .map_or(self.start_price, |high| high.amount)
    }

    /// Check if the deadline has passed at a specific timestamp.
    pub const fn is_expired_at(&self, now: u64) -> bool {
        self.expires_at <= now
    }

    /// Seconds until the deadline (0 if passed).
    pub const fn time_remaining_at(&self, now: u64) -> u64 {
        self.expires_at.saturating_sub(now)
    }

    /// Serialize to CBOR bytes for persistence.
    pub fn to_cbor(&self) -> MarketResult<Vec<u8>> {
        to_cbor(self)
    }

    /// Deserialize a persisted auction record.
    pub fn from_cbor(data: &[u8]) -> MarketResult<Self> {
        cbor_from_limited_reader(data, MAX_RECORD_SIZE)
    }
}

/// Filter applied by `list_auctions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuctionFilter {
    /// Every active listing.
    All,
    /// Listings that can be bought outright.
    WithBuyout,
    /// Listings created by one seller.
    OwnedBy(PlayerId),
}

/// Read-only view of a listing handed to the command layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionSummary {
    pub name: String,
    pub seller: PlayerId,
    pub state: AuctionState,
    pub current_price: u64,
    pub buyout_price: Option<u64>,
    pub expires_at: u64,
    pub has_bid: bool,
}

impl From<&Auction> for AuctionSummary {
    fn from(auction: &Auction) -> Self {
        Self {
            name: auction.name.clone(),
            seller: auction.seller.clone(),
            state: auction.state,
            current_price: auction.current_price(),
            buyout_price: auction.buyout_price,
            expires_at: auction.expires_at,
            has_bid: auction.has_bid(),
        }
    }
}

/// Builder for creating new listings.
pub struct AuctionBuilder<T: TimeProvider> {
    time: T,
    name: Option<String>,
    seller: Option<PlayerId>,
    item: Option<ItemPayload>,
    start_price: Option<u64>,
    buyout_price: Option<u64>,
    duration_secs: Option<u64>,
}

impl<T: TimeProvider> AuctionBuilder<T> {
    /// Create a new builder with a time provider.
    pub const fn new(time: T) -> Self {
        Self {
            time,
            name: None,
            seller: None,
            item: None,
            start_price: None,
            buyout_price: None,
            duration_secs: None,
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn seller(mut self, seller: PlayerId) -> Self {
        self.seller = Some(seller);
        self
    }

    #[must_use]
    pub fn item(mut self, item: ItemPayload) -> Self {
        self.item = Some(item);
        self
    }

    #[must_use]
    pub const fn start_price(mut self, amount: u64) -> Self {
        self.start_price = Some(amount);
        self
    }

    #[must_use]
    pub const fn buyout_price(mut self, amount: u64) -> Self {
        self.buyout_price = Some(amount);
        self
    }

    /// Set auction duration in seconds from now.
    #[must_use]
    pub const fn duration(mut self, seconds: u64) -> Self {
        self.duration_secs = Some(seconds);
        self
    }

    /// Build the listing, validating prices and duration.
    pub fn build(self) -> MarketResult<Auction> {
        let name = self
            .name
            .ok_or_else(|| MarketError::Validation("name is required".into()))?;
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(MarketError::Validation("name must not be empty".into()));
        }
        if trimmed.len() > MAX_NAME_LEN {
            return Err(MarketError::Validation(format!(
                "name must be at most {MAX_NAME_LEN} characters"
            )));
        }

        let start_price = self
            .start_price
            .ok_or_else(|| MarketError::Validation("start price is required".into()))?;
        if start_price == 0 {
            return Err(MarketError::Validation(
                "start price must be positive".into(),
            ));
        }
        if let Some(buyout) = self.buyout_price {
            if buyout <= start_price {
                return Err(MarketError::Validation(
                    "buyout price must exceed the start price".into(),
                ));
            }
        }

        let duration_secs = self
            .duration_secs
            .ok_or_else(|| MarketError::Validation("duration is required".into()))?;
        if duration_secs == 0 {
            return Err(MarketError::Validation("duration must be positive".into()));
        }

        let created_at = self.time.now_unix();
        Ok(Auction {
            name: trimmed.to_string(),
            seller: self
                .seller
                .ok_or_else(|| MarketError::Validation("seller is required".into()))?,
            item: self
                .item
                .ok_or_else(|| MarketError::Validation("item is required".into()))?,
            start_price,
            buyout_price: self.buyout_price,
            created_at,
            expires_at: created_at + duration_secs,
            highest_bid: None,
            state: AuctionState::Open,
            version: 0,
        })
    }
}
