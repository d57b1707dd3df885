//! The marketplace teleport anchor.

use serde::{Deserialize, Serialize};

use crate::config::MAX_RECORD_SIZE;
use crate::error::MarketResult;
use crate::marketplace::{Location, PlayerId};
use crate::util::{cbor_from_limited_reader, to_cbor};

/// Singleton physical location used as the marketplace teleport target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub location: Location,
    pub set_by: PlayerId,
    pub set_at: u64,
}

impl Anchor {
    /// Serialize to CBOR bytes for persistence.
    pub fn to_cbor(&self) -> MarketResult<Vec<u8>> {
        to_cbor(self)
    }

    /// Deserialize a persisted anchor record.
    pub fn from_cbor(data: &[u8]) -> MarketResult<Self> {
        cbor_from_limited_reader(data, MAX_RECORD_SIZE)
    }
}
