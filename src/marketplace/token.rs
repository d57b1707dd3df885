//! Buyout confirmation tokens.

use serde::{Deserialize, Serialize};

use crate::config::MAX_RECORD_SIZE;
use crate::error::MarketResult;
use crate::marketplace::PlayerId;
use crate::util::{cbor_from_limited_reader, to_cbor};

/// Short-lived record authorizing one player to finalize a buyout.
///
/// At most one live token exists per auction; issuing a new one discards
/// the predecessor. Expiry is implicit: tokens are checked lazily on access
/// and swept by the scheduler, never cancelled explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingBuyout {
    /// Index key of the auction this token belongs to.
    pub auction: String,
    /// The only player allowed to confirm.
    pub requester: PlayerId,
    pub issued_at: u64,
    pub expires_at: u64,
}

impl PendingBuyout {
    pub fn new(auction: impl Into<String>, requester: PlayerId, now: u64, ttl_secs: u64) -> Self {
        Self {
            auction: auction.into(),
            requester,
            issued_at: now,
            expires_at: now + ttl_secs,
        }
    }

    /// Check if the confirmation window has closed at a specific timestamp.
    pub const fn is_expired_at(&self, now: u64) -> bool {
        self.expires_at <= now
    }

    /// Serialize to CBOR bytes for persistence.
    pub fn to_cbor(&self) -> MarketResult<Vec<u8>> {
        to_cbor(self)
    }

    /// Deserialize a persisted token record.
    pub fn from_cbor(data: &[u8]) -> MarketResult<Self> {
        cbor_from_limited_reader(data, MAX_RECORD_SIZE)
    }
}
