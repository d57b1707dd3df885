//! Live buyout confirmation tokens.
//!
//! An explicit ephemeral map rather than a timer per token: expiry is
//! detected lazily on access and by the scheduler's periodic sweep.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::marketplace::PendingBuyout;

/// In-memory map of live tokens, one per auction at most.
#[derive(Default)]
pub struct PendingBuyouts {
    tokens: Mutex<HashMap<String, PendingBuyout>>,
}

impl PendingBuyouts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a token, returning the one it superseded.
    pub async fn put(&self, token: PendingBuyout) -> Option<PendingBuyout> {
        let mut tokens = self.tokens.lock().await;
        tokens.insert(token.auction.clone(), token)
    }

    /// Snapshot of the token for an auction, if any.
    pub async fn get(&self, auction_key: &str) -> Option<PendingBuyout> {
        let tokens = self.tokens.lock().await;
        tokens.get(auction_key).cloned()
    }

    /// Discard and return the token for an auction.
    pub async fn remove(&self, auction_key: &str) -> Option<PendingBuyout> {
        let mut tokens = self.tokens.lock().await;
        tokens.remove(auction_key)
    }

    /// Remove and return every token whose window has closed at `now`.
    pub async fn drain_expired(&self, now: u64) -> Vec<PendingBuyout> {
        let mut tokens = self.tokens.lock().await;
        let expired_keys: Vec<String> = tokens
            .iter()
            .filter(|(_, t)| t.is_expired_at(now))
            .map(|(k, _)| k.clone())
            .collect();
        expired_keys
            .into_iter()
            .filter_map(|k| tokens.remove(&k))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.tokens.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.lock().await.is_empty()
    }
}
