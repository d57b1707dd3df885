//! Mock item custody that records every delivery.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::marketplace::{ItemPayload, PlayerId};
use crate::traits::ItemCustody;

#[derive(Default)]
struct Inner {
    held_counter: AtomicU64,
    releases: Mutex<Vec<(PlayerId, ItemPayload)>>,
}

/// In-memory custody: `hold` mints a distinct payload, `release` records
/// who received what.
#[derive(Clone, Default)]
pub struct MockCustody {
    inner: Arc<Inner>,
}

impl MockCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(recipient, payload)` pair released so far, in order.
    pub async fn releases(&self) -> Vec<(PlayerId, ItemPayload)> {
        self.inner.releases.lock().await.clone()
    }

    /// Payloads delivered to one player.
    pub async fn released_to(&self, player: &PlayerId) -> Vec<ItemPayload> {
        self.inner
            .releases
            .lock()
            .await
            .iter()
            .filter(|(to, _)| to == player)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub async fn release_count(&self) -> usize {
        self.inner.releases.lock().await.len()
    }
}

#[async_trait]
impl ItemCustody for MockCustody {
    async fn hold(&self, player: &PlayerId) -> Result<ItemPayload> {
        let n = self.inner.held_counter.fetch_add(1, Ordering::SeqCst);
        Ok(ItemPayload::new(
            format!("held:{player}:{n}").into_bytes(),
        ))
    }

    async fn release(&self, payload: ItemPayload, to: &PlayerId) -> Result<()> {
        self.inner
            .releases
            .lock()
            .await
            .push((to.clone(), payload));
        Ok(())
    }
}
