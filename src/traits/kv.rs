//! Durable key/value storage abstraction.
//!
//! Auction records, buyout tokens, the anchor, and the gate flag are all
//! persisted through this surface and reloaded at startup. The concrete
//! format (flat file, database, plugin data folder) is the host's choice.

use anyhow::Result;
use async_trait::async_trait;

/// Abstraction over a durable key/value store.
///
/// Writes must be durable before returning: the engine reports an operation
/// as successful only after the corresponding `put` has completed.
#[async_trait]
pub trait KvStore: Send + Sync + Clone {
    /// Durably write a value under a key, replacing any previous value.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Read a value, or `None` if the key has never been written.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Remove a key. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// List all `(key, value)` pairs whose key starts with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>>;
}
