//! Auction engine for a game-server marketplace.
//!
//! Players list items for sale, others bid or buy outright, and listings
//! settle automatically on a timer. The engine owns listing state, bid
//! arbitration, the two-phase buyout flow, and expiry scheduling; money and
//! item movement go through injected collaborator traits so goods and funds
//! are never duplicated or lost. The surrounding command layer (argument
//! parsing, permissions, chat output, the actual teleport) lives in the
//! host plugin and calls the operations exposed here.

pub mod config;
pub mod engine;
pub mod error;
pub mod marketplace;
pub mod traits;
pub mod util;

#[cfg(any(test, feature = "test-support"))]
pub mod mocks;

pub use config::EngineConfig;
pub use engine::{
    AccessGate, AnchorRegistry, AuctionEngine, AuctionRecord, AuctionStore, EscrowLedger,
    PendingBuyouts, Reservation,
};
pub use error::{MarketError, MarketResult};
pub use marketplace::{
    Anchor, Auction, AuctionBuilder, AuctionFilter, AuctionState, AuctionSummary, HighBid,
    ItemPayload, Location, PendingBuyout, PlayerId,
};
pub use traits::{
    EconomyLedger, ItemCustody, KvStore, MarketEvent, Notifier, ReservationId, SystemTimeProvider,
    TimeProvider,
};
