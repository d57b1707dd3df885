//! Economy ledger abstraction for escrowed funds.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::marketplace::PlayerId;

/// Handle to a live reservation held against a player's balance.
///
/// Issued by the economy plugin; the engine treats it as opaque and only
/// hands it back for `release` or `transfer`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationId(pub String);

impl std::fmt::Display for ReservationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Abstraction over the server's economy plugin.
///
/// The implementation must guarantee atomic withdraw/deposit per player;
/// the engine guarantees it never holds two simultaneous reservations for
/// the same auction.
#[async_trait]
pub trait EconomyLedger: Send + Sync + Clone {
    /// Reserve `amount` against the player's balance.
    ///
    /// Returns `None` when the player cannot cover the amount. An `Err`
    /// signals an infrastructure fault, not a refusal.
    async fn reserve(&self, player: &PlayerId, amount: u64) -> Result<Option<ReservationId>>;

    /// Return a reservation to its owner's balance.
    async fn release(&self, reservation: &ReservationId) -> Result<()>;

    /// Pay a reservation out to another player, consuming it.
    async fn transfer(&self, reservation: &ReservationId, to: &PlayerId) -> Result<()>;
}
