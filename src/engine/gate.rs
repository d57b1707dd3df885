//! Process-wide marketplace singletons: the access gate and the teleport
//! anchor. Both are explicit service objects injected into the engine, not
//! ambient globals.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::marketplace::Anchor;

/// Global switch enabling or disabling new auction activity.
///
/// Closing the gate blocks `set_auction`, `bid`, and `buyout_request`;
/// listings, cancellation, and in-flight buyout confirmations continue.
#[derive(Debug)]
pub struct AccessGate {
    open: AtomicBool,
}

impl AccessGate {
    pub const fn new(open: bool) -> Self {
        Self {
            open: AtomicBool::new(open),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Flip the gate, returning the previous value.
    pub fn set(&self, open: bool) -> bool {
        self.open.swap(open, Ordering::SeqCst)
    }
}

impl Default for AccessGate {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Holder of the single optional marketplace teleport point.
#[derive(Debug, Default)]
pub struct AnchorRegistry {
    inner: RwLock<Option<Anchor>>,
}

impl AnchorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the anchor, returning the previous one.
    pub fn set(&self, anchor: Anchor) -> Option<Anchor> {
        self.inner.write().replace(anchor)
    }

    /// Remove and return the anchor.
    pub fn take(&self) -> Option<Anchor> {
        self.inner.write().take()
    }

    /// Snapshot of the current anchor.
    pub fn get(&self) -> Option<Anchor> {
        self.inner.read().clone()
    }

    pub fn is_set(&self) -> bool {
        self.inner.read().is_some()
    }
}
