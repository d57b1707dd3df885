pub mod anchor;
pub mod auction;
pub mod ids;
pub mod token;

pub use anchor::Anchor;
pub use auction::{
    Auction, AuctionBuilder, AuctionFilter, AuctionState, AuctionSummary, HighBid,
};
pub use ids::{ItemPayload, Location, PlayerId};
pub use token::PendingBuyout;
