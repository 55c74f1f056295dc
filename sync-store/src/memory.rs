//! In-memory storage backend.

use crate::error::StoreResult;
use crate::{admit, replica_order, EventStore, UpsertSummary};
use async_trait::async_trait;
use std::collections::HashMap;
use sync_types::Event;
use tokio::sync::RwLock;
use tracing::warn;

/// Event store held entirely in memory.
///
/// Same semantics as [`SqliteEventStore`](crate::SqliteEventStore); contents
/// are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    events: RwLock<HashMap<String, Event>>,
}

impl MemoryEventStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn upsert_many(&self, events: &[Event]) -> StoreResult<UpsertSummary> {
        let mut summary = UpsertSummary::default();
        // Held for the whole batch so readers never observe half of it.
        let mut stored = self.events.write().await;

        for event in events {
            if let Err(rejected) = admit(event) {
                warn!(id = %rejected.id, reason = %rejected.reason, "Rejected malformed event");
                summary.rejected.push(rejected);
                continue;
            }
            if stored.contains_key(&event.id) {
                summary.duplicates += 1;
            } else {
                stored.insert(event.id.clone(), event.clone());
                summary.inserted += 1;
            }
        }

        Ok(summary)
    }

    async fn get_all(&self) -> StoreResult<Vec<Event>> {
        let mut events: Vec<Event> = self.events.read().await.values().cloned().collect();
        events.sort_by(replica_order);
        Ok(events)
    }

    async fn latest_timestamp(&self) -> StoreResult<Option<u64>> {
        Ok(self
            .events
            .read()
            .await
            .values()
            .map(|e| e.created_at)
            .max())
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.events.read().await.len() as u64)
    }
}
