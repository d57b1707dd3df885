//! Escrow ledger: reserved funds tracked per auction.
//!
//! The ledger guarantees the core money invariant: at most one live
//! reservation per auction, owned by the current highest bidder. Reserving
//! happens *before* a bid commits (so a failed commit can refund without
//! ever exposing two live holds), and swapping the live reservation happens
//! inside the bid's committed critical section.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::info;

use crate::error::{MarketError, MarketResult};
use crate::marketplace::PlayerId;
use crate::traits::{EconomyLedger, ReservationId};

/// Funds held against a bidder for one auction.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub bidder: PlayerId,
    pub id: ReservationId,
    pub amount: u64,
}

/// Tracks which reservation is live per auction and drives the economy
/// collaborator.
pub struct EscrowLedger<E: EconomyLedger> {
    economy: E,
    held: Mutex<HashMap<String, Reservation>>,
}

impl<E: EconomyLedger> EscrowLedger<E> {
    pub fn new(economy: E) -> Self {
        Self {
            economy,
            held: Mutex::new(HashMap::new()),
        }
    }

    /// Reserve funds for a prospective bid.
    ///
    /// The reservation is not yet live for any auction: the caller commits
    /// it with [`swap_live`](Self::swap_live) or refunds it with
    /// [`refund`](Self::refund).
    pub async fn reserve(&self, bidder: &PlayerId, amount: u64) -> MarketResult<Reservation> {
        let id = self
            .economy
            .reserve(bidder, amount)
            .await
            .map_err(MarketError::Other)?
            .ok_or(MarketError::InsufficientFunds(amount))?;
        Ok(Reservation {
            bidder: bidder.clone(),
            id,
            amount,
        })
    }

    /// Make `new` the live reservation for an auction, returning the
    /// previous one (which the caller refunds outside any record lock).
    pub async fn swap_live(&self, auction_key: &str, new: Reservation) -> Option<Reservation> {
        let mut held = self.held.lock().await;
        held.insert(auction_key.to_string(), new)
    }

    /// Detach and return the live reservation for an auction, if any.
    pub async fn take_live(&self, auction_key: &str) -> Option<Reservation> {
        let mut held = self.held.lock().await;
        held.remove(auction_key)
    }

    /// Amount currently escrowed for an auction.
    pub async fn held_amount(&self, auction_key: &str) -> Option<u64> {
        let held = self.held.lock().await;
        held.get(auction_key).map(|r| r.amount)
    }

    /// Return a reservation to its owner.
    pub async fn refund(&self, reservation: Reservation) -> MarketResult<()> {
        self.economy
            .release(&reservation.id)
            .await
            .map_err(MarketError::Other)?;
        info!(
            "Refunded {} to {} (reservation {})",
            reservation.amount, reservation.bidder, reservation.id
        );
        Ok(())
    }

    /// Pay a reservation out to a player, consuming it.
    pub async fn payout(&self, reservation: Reservation, to: &PlayerId) -> MarketResult<()> {
        self.economy
            .transfer(&reservation.id, to)
            .await
            .map_err(MarketError::Other)?;
        info!(
            "Paid {} from {} to {} (reservation {})",
            reservation.amount, reservation.bidder, to, reservation.id
        );
        Ok(())
    }
}
