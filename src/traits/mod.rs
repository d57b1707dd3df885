//! Trait abstractions for dependency injection and testability.
//!
//! This module provides trait-based abstractions for the engine's external
//! collaborators (economy ledger, item custody, notifications, durable
//! storage, time), enabling unit testing without a running game server.

pub mod custody;
pub mod economy;
pub mod kv;
pub mod notify;
pub mod time;

// Re-export all traits for crate-internal use.
// The public API surface is controlled by lib.rs re-exports.
pub use custody::ItemCustody;
pub use economy::{EconomyLedger, ReservationId};
pub use kv::KvStore;
pub use notify::{MarketEvent, Notifier};
pub use time::TimeProvider;

// Re-export default implementations
pub use time::SystemTimeProvider;
