//! Mock implementations for testing.
//!
//! This module provides mock implementations of the collaborator traits
//! that allow unit testing without a running game server, economy plugin,
//! or storage backend.

pub mod custody;
pub mod economy;
pub mod kv;
pub mod notify;
pub mod time;

pub use custody::MockCustody;
pub use economy::MockEconomy;
pub use kv::MockKv;
pub use notify::MockNotifier;
pub use time::MockTime;

use crate::marketplace::{ItemPayload, PlayerId};

/// Helper to create a deterministic test player identity.
pub fn make_player(id: u8) -> PlayerId {
    PlayerId::new(format!("player-{id}"))
}

/// Helper to create a recognizable opaque item payload.
pub fn make_item(label: &str) -> ItemPayload {
    ItemPayload::new(format!("payload:{label}").into_bytes())
}
