//! Mock notifier that records every event.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::marketplace::PlayerId;
use crate::traits::{MarketEvent, Notifier};

/// In-memory notifier: events are appended and can be inspected per player.
#[derive(Clone, Default)]
pub struct MockNotifier {
    events: Arc<Mutex<Vec<(PlayerId, MarketEvent)>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(recipient, event)` pair delivered so far, in order.
    pub async fn events(&self) -> Vec<(PlayerId, MarketEvent)> {
        self.events.lock().await.clone()
    }

    /// Events delivered to one player.
    pub async fn events_for(&self, player: &PlayerId) -> Vec<MarketEvent> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|(to, _)| to == player)
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub async fn clear(&self) {
        self.events.lock().await.clear();
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, player: &PlayerId, event: MarketEvent) {
        self.events.lock().await.push((player.clone(), event));
    }
}
