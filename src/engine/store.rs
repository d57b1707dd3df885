//! Authoritative indexed collection of auction records.
//!
//! The name index is guarded by a short-held global `RwLock`; every record
//! sits behind its own `Mutex` so unrelated auctions stay independent. All
//! commits persist through the [`KvStore`] before touching memory: a failed
//! write surfaces `Persistence` and leaves the in-memory record unchanged.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::config::keys;
use crate::error::{MarketError, MarketResult};
use crate::marketplace::Auction;
use crate::traits::KvStore;
use crate::util::name_key;

/// A single auction guarded by its per-record critical section.
pub type AuctionRecord = Arc<Mutex<Auction>>;

fn auction_kv_key(key: &str) -> String {
    format!("{}{key}", keys::AUCTION_PREFIX)
}

fn archive_kv_key(key: &str, created_at: u64) -> String {
    format!("{}{key}/{created_at}", keys::ARCHIVE_PREFIX)
}

/// Indexed store of active listings, keyed by case-folded name.
pub struct AuctionStore<P: KvStore> {
    kv: P,
    index: RwLock<HashMap<String, AuctionRecord>>,
}

impl<P: KvStore> AuctionStore<P> {
    pub fn new(kv: P) -> Self {
        Self {
            kv,
            index: RwLock::new(HashMap::new()),
        }
    }

    /// Look up an active record. Returns the record handle; callers lock it
    /// themselves for reads and mutations.
    pub async fn get(&self, name: &str) -> Option<AuctionRecord> {
        let index = self.index.read().await;
        index.get(&name_key(name)).cloned()
    }

    /// Whether an active listing with this name exists.
    pub async fn contains(&self, name: &str) -> bool {
        let index = self.index.read().await;
        index.contains_key(&name_key(name))
    }

    /// Snapshot of all active records as `(index key, record)` pairs.
    ///
    /// The snapshot is taken under the short global lock; records may settle
    /// concurrently, so callers re-check state under each record's lock.
    pub async fn records(&self) -> Vec<(String, AuctionRecord)> {
        let index = self.index.read().await;
        index
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Number of active listings.
    pub async fn len(&self) -> usize {
        self.index.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.index.read().await.is_empty()
    }

    /// Insert a freshly created auction.
    ///
    /// The record is persisted before it becomes visible in the index. A
    /// concurrent insert of the same name loses deterministically: the
    /// persisted record of the loser is rolled back.
    pub async fn insert(&self, auction: Auction) -> MarketResult<AuctionRecord> {
        let key = name_key(&auction.name);

        // Fast path duplicate check outside the write lock.
        if self.contains(&auction.name).await {
            return Err(MarketError::DuplicateName(auction.name));
        }

        let data = auction.to_cbor()?;
        self.kv
            .put(&auction_kv_key(&key), data)
            .await
            .map_err(|e| MarketError::Persistence(e.to_string()))?;

        let record = Arc::new(Mutex::new(auction));
        {
            let mut index = self.index.write().await;
            if index.contains_key(&key) {
                drop(index);
                // Lost the race: undo our persisted record.
                if let Err(e) = self.kv.delete(&auction_kv_key(&key)).await {
                    warn!("Failed to roll back persisted duplicate '{}': {}", key, e);
                }
                let name = record.lock().await.name.clone();
                return Err(MarketError::DuplicateName(name));
            }
            index.insert(key.clone(), record.clone());
        }

        info!("Listing '{}' added to the active index", key);
        Ok(record)
    }

    /// Persist `updated` and swap it into the record slot.
    ///
    /// Must be called while holding the record's lock (`guard`). On a write
    /// failure the in-memory record keeps its previous contents.
    pub async fn commit(&self, guard: &mut Auction, updated: Auction) -> MarketResult<()> {
        let key = name_key(&updated.name);
        let data = updated.to_cbor()?;
        self.kv
            .put(&auction_kv_key(&key), data)
            .await
            .map_err(|e| MarketError::Persistence(e.to_string()))?;
        *guard = updated;
        Ok(())
    }

    /// Persist `updated` as history, drop the active record, and remove the
    /// listing from the index.
    ///
    /// Must be called while holding the record's lock. `updated.state` must
    /// be terminal. Ordering is archive-put, active-delete, memory swap,
    /// index removal: a crash in between leaves the active record
    /// authoritative so settlement simply re-runs after reload.
    pub async fn commit_terminal(&self, guard: &mut Auction, updated: Auction) -> MarketResult<()> {
        debug_assert!(updated.state.is_terminal());
        let key = name_key(&updated.name);

        let data = updated.to_cbor()?;
        self.kv
            .put(&archive_kv_key(&key, updated.created_at), data)
            .await
            .map_err(|e| MarketError::Persistence(e.to_string()))?;
        self.kv
            .delete(&auction_kv_key(&key))
            .await
            .map_err(|e| MarketError::Persistence(e.to_string()))?;

        *guard = updated;

        let mut index = self.index.write().await;
        index.remove(&key);
        drop(index);

        info!("Listing '{}' left the active index", key);
        Ok(())
    }

    /// Restore active listings from the key/value store at startup.
    ///
    /// Corrupt or terminal records are skipped with a warning rather than
    /// failing the whole reload.
    pub async fn load(&self) -> MarketResult<usize> {
        let entries = self
            .kv
            .list(keys::AUCTION_PREFIX)
            .await
            .map_err(|e| MarketError::Persistence(e.to_string()))?;

        let mut restored = 0;
        let mut index = self.index.write().await;
        for (kv_key, data) in entries {
            match Auction::from_cbor(&data) {
                Ok(auction) if auction.state.is_terminal() => {
                    warn!(
                        "Skipping terminal record '{}' found under the active prefix",
                        kv_key
                    );
                }
                Ok(auction) => {
                    index.insert(name_key(&auction.name), Arc::new(Mutex::new(auction)));
                    restored += 1;
                }
                Err(e) => {
                    warn!("Skipping corrupt auction record '{}': {}", kv_key, e);
                }
            }
        }
        drop(index);

        if restored > 0 {
            info!("Restored {} active listing(s) from storage", restored);
        }
        Ok(restored)
    }
}
