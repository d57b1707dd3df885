//! Utility functions shared across the auction engine.

use crate::error::{MarketError, MarketResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serialize a record to CBOR bytes.
pub fn to_cbor<T: Serialize>(value: &T) -> MarketResult<Vec<u8>> {
    let mut buffer = Vec::new();
    ciborium::into_writer(value, &mut buffer)
        .map_err(|e| MarketError::Serialization(format!("CBOR serialization failed: {e}")))?;
    Ok(buffer)
}

/// Deserialize CBOR data with a size limit to prevent oversized payloads.
pub fn cbor_from_limited_reader<T: DeserializeOwned>(
    data: &[u8],
    max_bytes: usize,
) -> MarketResult<T> {
    if data.len() > max_bytes {
        return Err(MarketError::Validation(format!(
            "CBOR payload too large: {} bytes (max {})",
            data.len(),
            max_bytes
        )));
    }
    ciborium::from_reader(data)
        .map_err(|e| MarketError::Serialization(format!("CBOR deserialization failed: {e}")))
}

/// Canonical index key for an auction name: uniqueness among active
/// listings is case-insensitive, display casing is preserved elsewhere.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}
