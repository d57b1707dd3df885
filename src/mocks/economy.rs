//! Mock economy ledger with controllable balances and failure injection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::marketplace::PlayerId;
use crate::traits::{EconomyLedger, ReservationId};

#[derive(Default)]
struct Inner {
    balances: Mutex<HashMap<PlayerId, u64>>,
    reservations: Mutex<HashMap<ReservationId, (PlayerId, u64)>>,
    next_id: AtomicU64,
    fail_mode: AtomicBool,
}

/// In-memory economy: balances, reservations, atomic per-player moves.
///
/// A released or transferred reservation must exist — double release is an
/// error here precisely so tests catch double-refund bugs in the engine.
#[derive(Clone, Default)]
pub struct MockEconomy {
    inner: Arc<Inner>,
}

impl MockEconomy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a player's balance.
    pub async fn set_balance(&self, player: &PlayerId, amount: u64) {
        self.inner
            .balances
            .lock()
            .await
            .insert(player.clone(), amount);
    }

    /// A player's free (unreserved) balance.
    pub async fn balance(&self, player: &PlayerId) -> u64 {
        self.inner
            .balances
            .lock()
            .await
            .get(player)
            .copied()
            .unwrap_or(0)
    }

    /// Sum of every live reservation held against one player.
    pub async fn reserved_for(&self, player: &PlayerId) -> u64 {
        self.inner
            .reservations
            .lock()
            .await
            .values()
            .filter(|(owner, _)| owner == player)
            .map(|(_, amount)| amount)
            .sum()
    }

    /// Sum of every live reservation in the ledger.
    pub async fn total_reserved(&self) -> u64 {
        self.inner
            .reservations
            .lock()
            .await
            .values()
            .map(|(_, amount)| amount)
            .sum()
    }

    /// Number of live reservations.
    pub async fn reservation_count(&self) -> usize {
        self.inner.reservations.lock().await.len()
    }

    /// When enabled, every economy call fails with an infrastructure error.
    pub fn set_fail_mode(&self, fail: bool) {
        self.inner.fail_mode.store(fail, Ordering::SeqCst);
    }

    fn check_fail(&self) -> Result<()> {
        if self.inner.fail_mode.load(Ordering::SeqCst) {
            return Err(anyhow!("mock economy failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl EconomyLedger for MockEconomy {
    async fn reserve(&self, player: &PlayerId, amount: u64) -> Result<Option<ReservationId>> {
        self.check_fail()?;
        let mut balances = self.inner.balances.lock().await;
        let balance = balances.entry(player.clone()).or_insert(0);
        if *balance < amount {
            return Ok(None);
        }
        *balance -= amount;
        drop(balances);

        let id = ReservationId(format!(
            "rsv-{}",
            self.inner.next_id.fetch_add(1, Ordering::SeqCst)
        ));
        self.inner
            .reservations
            .lock()
            .await
            .insert(id.clone(), (player.clone(), amount));
        Ok(Some(id))
    }

    async fn release(&self, reservation: &ReservationId) -> Result<()> {
        self.check_fail()?;
        let (owner, amount) = self
            .inner
            .reservations
            .lock()
            .await
            .remove(reservation)
            .ok_or_else(|| anyhow!("unknown reservation {reservation}"))?;
        *self.inner.balances.lock().await.entry(owner).or_insert(0) += amount;
        Ok(())
    }

    async fn transfer(&self, reservation: &ReservationId, to: &PlayerId) -> Result<()> {
        self.check_fail()?;
        let (_, amount) = self
            .inner
            .reservations
            .lock()
            .await
            .remove(reservation)
            .ok_or_else(|| anyhow!("unknown reservation {reservation}"))?;
        *self
            .inner
            .balances
            .lock()
            .await
            .entry(to.clone())
            .or_insert(0) += amount;
        Ok(())
    }
}
