//! Configuration constants for the auction engine.
//!
//! This module centralizes magic numbers and configuration values
//! to improve maintainability and enable easier tuning.

/// Default auction lifetime when the seller omits a duration (24 hours).
pub const DEFAULT_AUCTION_DURATION_SECS: u64 = 86_400;

/// Longest duration a seller may request, in hours (one week).
pub const MAX_AUCTION_DURATION_HOURS: u64 = 168;

/// Seconds a buyout confirmation token stays valid after `buyout_request`.
pub const BUYOUT_CONFIRM_TTL_SECS: u64 = 30;

/// Interval in seconds between expiry-scheduler passes over the store.
pub const SCHEDULER_POLL_INTERVAL_SECS: u64 = 5;

/// Maximum size in bytes accepted when decoding a persisted CBOR record.
pub const MAX_RECORD_SIZE: usize = 32_768;

/// Environment variable overriding the default auction duration (in hours).
pub const DEFAULT_DURATION_HOURS_ENV: &str = "BAZAAR_DEFAULT_DURATION_HOURS";

/// Environment variable overriding the buyout confirmation TTL (in seconds).
pub const BUYOUT_TTL_ENV: &str = "BAZAAR_BUYOUT_TTL_SECS";

/// Key prefixes for the durable key/value store.
pub mod keys {
    /// Active auction records, one per listing.
    pub const AUCTION_PREFIX: &str = "auction/";
    /// Settled/expired/cancelled auction records, retained as history.
    pub const ARCHIVE_PREFIX: &str = "archive/";
    /// Live buyout confirmation tokens.
    pub const TOKEN_PREFIX: &str = "token/";
    /// Singleton marketplace anchor.
    pub const ANCHOR: &str = "anchor";
    /// Singleton access gate flag.
    pub const GATE: &str = "gate";
}

/// Tunable engine parameters, resolved once at construction time.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Applied when `set_auction` is called without an explicit duration.
    pub default_duration_secs: u64,
    /// Upper bound on requested auction duration, in hours.
    pub max_duration_hours: u64,
    /// Buyout confirmation token lifetime.
    pub buyout_ttl_secs: u64,
    /// Expiry-scheduler poll period.
    pub poll_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_duration_secs: DEFAULT_AUCTION_DURATION_SECS,
            max_duration_hours: MAX_AUCTION_DURATION_HOURS,
            buyout_ttl_secs: BUYOUT_CONFIRM_TTL_SECS,
            poll_interval_secs: SCHEDULER_POLL_INTERVAL_SECS,
        }
    }
}

impl EngineConfig {
    /// Build a config from the defaults plus any environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(hours) = read_env_u64(DEFAULT_DURATION_HOURS_ENV) {
            config.default_duration_secs = hours.saturating_mul(3600);
        }
        if let Some(secs) = read_env_u64(BUYOUT_TTL_ENV) {
            config.buyout_ttl_secs = secs;
        }
        config
    }
}

fn read_env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|s| s.parse::<u64>().ok())
}

/// Return the current Unix timestamp in seconds.
///
/// This is a convenience wrapper that avoids the boilerplate of
/// `SystemTimeProvider::new().now_unix()` in production code paths.
/// For testable code, prefer accepting a `TimeProvider` parameter instead.
pub fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
