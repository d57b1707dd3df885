//! Item custody abstraction.
//!
//! The engine never inspects goods: it receives an opaque payload when a
//! listing is created and hands it back to the custody collaborator when
//! the auction resolves.

use anyhow::Result;
use async_trait::async_trait;

use crate::marketplace::{ItemPayload, PlayerId};

/// Abstraction over the server's item-custody mechanism.
#[async_trait]
pub trait ItemCustody: Send + Sync + Clone {
    /// Take the item to be sold out of the player's possession.
    ///
    /// Called by the command layer at listing time; the resulting payload
    /// is passed into `set_auction`.
    async fn hold(&self, player: &PlayerId) -> Result<ItemPayload>;

    /// Deliver a payload into a player's possession.
    ///
    /// Called by the engine on settlement (to the winner), on expiry and
    /// cancellation (back to the seller).
    async fn release(&self, payload: ItemPayload, to: &PlayerId) -> Result<()>;
}
