//! The auction engine: listing state, bid arbitration, two-phase buyout,
//! and timed settlement behind one facade.
//!
//! [`AuctionEngine`] is generic over its collaborators (economy, custody,
//! notifications, durable storage, time) so the same code path tested with
//! mocks runs in production. The command layer owns argument parsing and
//! permissions and calls the operations here directly; the expiry scheduler
//! runs on its own timer task against the same store.

use std::sync::Mutex as StdMutex;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{keys, EngineConfig};
use crate::error::{MarketError, MarketResult};
use crate::marketplace::{Anchor, Auction, AuctionState, Location, PendingBuyout, PlayerId};
use crate::traits::{EconomyLedger, ItemCustody, KvStore, Notifier, TimeProvider};
use crate::util::{cbor_from_limited_reader, name_key, to_cbor};

mod bid;
mod buyout;
mod escrow;
mod gate;
mod listing;
mod scheduler;
mod store;
mod tokens;

pub use escrow::{EscrowLedger, Reservation};
pub use gate::{AccessGate, AnchorRegistry};
pub use store::{AuctionRecord, AuctionStore};
pub use tokens::PendingBuyouts;

/// Coordinates the marketplace: owns the store, the escrow ledger, the
/// singletons, and the live buyout tokens.
///
/// # Lock ordering
///
/// When acquiring multiple locks, always follow this order to prevent
/// deadlocks:
///
/// 1. a record's `Mutex` (via [`AuctionStore::get`])
/// 2. the store's name index
/// 3. the escrow ledger / token map
///
/// Never hold a record lock across a call to the economy, custody, or
/// notifier collaborators — they may re-enter the engine. The persistence
/// write is the one external call made under a record lock (it cannot
/// re-enter). Mutations snapshot under the lock, release, perform the
/// external call, re-acquire, and commit only if `version` is unchanged.
pub struct AuctionEngine<E, C, N, P, T>
where
    E: EconomyLedger,
    C: ItemCustody,
    N: Notifier,
    P: KvStore,
    T: TimeProvider,
{
    config: EngineConfig,
    store: AuctionStore<P>,
    escrow: EscrowLedger<E>,
    custody: C,
    notifier: N,
    kv: P,
    time: T,
    gate: AccessGate,
    anchor: AnchorRegistry,
    tokens: PendingBuyouts,
    shutdown: CancellationToken,
    scheduler_handle: StdMutex<Option<JoinHandle<()>>>,
}

impl<E, C, N, P, T> AuctionEngine<E, C, N, P, T>
where
    E: EconomyLedger,
    C: ItemCustody,
    N: Notifier,
    P: KvStore,
    T: TimeProvider,
{
    /// Create an engine with empty state. Call [`load`](Self::load) to
    /// restore persisted listings before serving commands.
    pub fn new(config: EngineConfig, economy: E, custody: C, notifier: N, kv: P, time: T) -> Self {
        Self {
            config,
            store: AuctionStore::new(kv.clone()),
            escrow: EscrowLedger::new(economy),
            custody,
            notifier,
            kv,
            time,
            gate: AccessGate::default(),
            anchor: AnchorRegistry::new(),
            tokens: PendingBuyouts::new(),
            shutdown: CancellationToken::new(),
            scheduler_handle: StdMutex::new(None),
        }
    }

    /// Restore the gate, the anchor, active listings, and live buyout
    /// tokens from the key/value store.
    ///
    /// Tokens that expired while the process was down are kept: the first
    /// scheduler sweep (or the next access) reverts their auctions to
    /// `Open`. Tokens whose auction is gone or no longer pending are
    /// dropped as orphans.
    pub async fn load(&self) -> MarketResult<()> {
        if let Some(data) = self
            .kv
            .get(keys::GATE)
            .await
            .map_err(|e| MarketError::Persistence(e.to_string()))?
        {
            let open: bool = cbor_from_limited_reader(&data, 64)?;
            self.gate.set(open);
            info!("Restored gate state: {}", if open { "open" } else { "closed" });
        }

        if let Some(data) = self
            .kv
            .get(keys::ANCHOR)
            .await
            .map_err(|e| MarketError::Persistence(e.to_string()))?
        {
            match Anchor::from_cbor(&data) {
                Ok(anchor) => {
                    info!("Restored marketplace anchor at {}", anchor.location);
                    self.anchor.set(anchor);
                }
                Err(e) => warn!("Skipping corrupt anchor record: {}", e),
            }
        }

        self.store.load().await?;

        let token_entries = self
            .kv
            .list(keys::TOKEN_PREFIX)
            .await
            .map_err(|e| MarketError::Persistence(e.to_string()))?;
        for (kv_key, data) in token_entries {
            let token = match PendingBuyout::from_cbor(&data) {
                Ok(token) => token,
                Err(e) => {
                    warn!("Skipping corrupt buyout token '{}': {}", kv_key, e);
                    continue;
                }
            };
            let pending = match self.store.get(&token.auction).await {
                Some(record) => record.lock().await.state == AuctionState::PendingBuyout,
                None => false,
            };
            if pending {
                self.tokens.put(token).await;
            } else {
                warn!("Dropping orphan buyout token '{}'", kv_key);
                if let Err(e) = self.kv.delete(&kv_key).await {
                    warn!("Failed to delete orphan token '{}': {}", kv_key, e);
                }
            }
        }

        Ok(())
    }

    /// Signal the scheduler task to stop. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Snapshot of one active listing.
    pub async fn get_auction(&self, name: &str) -> Option<Auction> {
        let record = self.store.get(name).await?;
        let auction = record.lock().await.clone();
        Some(auction)
    }

    /// Amount currently escrowed against a listing (introspection/tests).
    pub async fn escrowed_amount(&self, name: &str) -> Option<u64> {
        self.escrow.held_amount(&name_key(name)).await
    }

    // ------------------------------------------------------------------
    // Gate
    // ------------------------------------------------------------------

    pub fn is_open(&self) -> bool {
        self.gate.is_open()
    }

    /// Toggle the marketplace gate. Closing blocks new listings, bids, and
    /// buyout requests; it does not touch pending or settling auctions.
    pub async fn set_open(&self, open: bool) -> MarketResult<()> {
        let data = to_cbor(&open)?;
        self.kv
            .put(keys::GATE, data)
            .await
            .map_err(|e| MarketError::Persistence(e.to_string()))?;
        let was = self.gate.set(open);
        if was != open {
            info!("Marketplace {}", if open { "opened" } else { "closed" });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Anchor
    // ------------------------------------------------------------------

    /// Set the marketplace teleport anchor, replacing any previous one.
    pub async fn spawn_anchor(&self, location: Location, set_by: &PlayerId) -> MarketResult<Anchor> {
        let anchor = Anchor {
            location,
            set_by: set_by.clone(),
            set_at: self.time.now_unix(),
        };
        let data = anchor.to_cbor()?;
        self.kv
            .put(keys::ANCHOR, data)
            .await
            .map_err(|e| MarketError::Persistence(e.to_string()))?;
        info!("Marketplace anchor set to {} by {}", anchor.location, set_by);
        self.anchor.set(anchor.clone());
        Ok(anchor)
    }

    /// Remove the anchor, returning it if one was set.
    pub async fn remove_spawn_anchor(&self) -> MarketResult<Option<Anchor>> {
        self.kv
            .delete(keys::ANCHOR)
            .await
            .map_err(|e| MarketError::Persistence(e.to_string()))?;
        let removed = self.anchor.take();
        if removed.is_some() {
            info!("Marketplace anchor removed");
        }
        Ok(removed)
    }

    /// Resolve the teleport target for a player. The command layer performs
    /// the actual teleport.
    pub fn teleport(&self, player: &PlayerId) -> MarketResult<Location> {
        let anchor = self
            .anchor
            .get()
            .ok_or_else(|| MarketError::NotFound("no marketplace anchor is set".into()))?;
        info!("Teleporting {} to the marketplace at {}", player, anchor.location);
        Ok(anchor.location)
    }

    // ------------------------------------------------------------------
    // Shared internals
    // ------------------------------------------------------------------

    /// Verify a record is `Open`, lazily reverting a lapsed buyout window.
    /// Caller holds the record lock.
    pub(crate) async fn ensure_open(&self, guard: &mut Auction) -> MarketResult<()> {
        match guard.state {
            AuctionState::Open => Ok(()),
            AuctionState::PendingBuyout => {
                let key = name_key(&guard.name);
                let now = self.time.now_unix();
                match self.tokens.get(&key).await {
                    Some(token) if !token.is_expired_at(now) => Err(MarketError::StateConflict(
                        "a buyout is pending on this auction".into(),
                    )),
                    // Token lapsed (or vanished): the window is over.
                    _ => self.revert_to_open(guard).await,
                }
            }
            state => Err(MarketError::StateConflict(format!(
                "auction is not open ({state:?})"
            ))),
        }
    }

    /// Revert a `PendingBuyout` listing to `Open` after its token lapsed.
    /// Caller holds the record lock.
    pub(crate) async fn revert_to_open(&self, guard: &mut Auction) -> MarketResult<()> {
        let key = name_key(&guard.name);
        let mut updated = guard.clone();
        updated.state = AuctionState::Open;
        updated.version += 1;
        self.store.commit(guard, updated).await?;
        self.discard_token(&key).await;
        info!("Buyout window on '{}' lapsed; auction reopened", key);
        Ok(())
    }

    /// Durably record a buyout token.
    pub(crate) async fn persist_token(&self, token: &PendingBuyout) -> MarketResult<()> {
        let data = token.to_cbor()?;
        self.kv
            .put(&format!("{}{}", keys::TOKEN_PREFIX, token.auction), data)
            .await
            .map_err(|e| MarketError::Persistence(e.to_string()))
    }

    /// Drop a token from memory and storage. Storage failures are logged,
    /// not surfaced: a stale token record is discarded as an orphan on the
    /// next reload.
    pub(crate) async fn discard_token(&self, auction_key: &str) {
        self.tokens.remove(auction_key).await;
        if let Err(e) = self
            .kv
            .delete(&format!("{}{auction_key}", keys::TOKEN_PREFIX))
            .await
        {
            warn!(
                "Failed to delete buyout token record for '{}': {}",
                auction_key, e
            );
        }
    }
}
