//! # sync-store
//!
//! Durable local replica of events.
//!
//! The store is append-only: events are keyed by id, a second upsert of the
//! same id is a no-op, and nothing here deletes or rewrites a stored event.
//! Reads return every event most-recent-first.
//!
//! Two backends implement [`EventStore`]:
//! - [`SqliteEventStore`] - persistent, WAL-mode SQLite via `sqlx`
//! - [`MemoryEventStore`] - ephemeral, for tests and throwaway replicas

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod memory;
mod sqlite;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryEventStore;
pub use sqlite::SqliteEventStore;

use async_trait::async_trait;
use std::cmp::Ordering;
use sync_types::Event;

/// An event the store refused to admit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEvent {
    /// Id as received (may itself be the malformed part).
    pub id: String,
    /// Why it was refused.
    pub reason: String,
}

/// Result of one [`EventStore::upsert_many`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    /// Net-new events written.
    pub inserted: usize,
    /// Events whose id was already stored (or repeated in the batch).
    pub duplicates: usize,
    /// Structurally malformed events, skipped without aborting the batch.
    pub rejected: Vec<RejectedEvent>,
}

/// Trait for event storage backends.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert each event unless its id is already present.
    ///
    /// The batch is applied atomically: readers see all of it or none of it,
    /// and an error leaves previously stored events untouched.
    async fn upsert_many(&self, events: &[Event]) -> StoreResult<UpsertSummary>;

    /// Every stored event, newest `created_at` first, ties by id ascending.
    async fn get_all(&self) -> StoreResult<Vec<Event>>;

    /// Highest stored `created_at`, or `None` when the store is empty.
    async fn latest_timestamp(&self) -> StoreResult<Option<u64>>;

    /// Number of stored events.
    async fn count(&self) -> StoreResult<u64>;
}

/// Per-item admission check shared by every backend.
pub(crate) fn admit(event: &Event) -> Result<(), RejectedEvent> {
    let reject = |reason: String| RejectedEvent {
        id: event.id.clone(),
        reason,
    };
    event.validate().map_err(|e| reject(e.to_string()))?;
    if i64::try_from(event.created_at).is_err() {
        return Err(reject(format!("created_at {} out of range", event.created_at)));
    }
    Ok(())
}

/// Replica read order: newest first, then id ascending.
pub(crate) fn replica_order(a: &Event, b: &Event) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use sync_types::{Event, KIND_ENCRYPTED_DIRECT_MESSAGE};

    pub const STAFF: &str = "6d3907327333dfb1b6f6100f9fdd1c6cbaa50b3acc801cf4cf5d937b838ee80b";
    pub const SHOP: &str = "c1a9ea801212d71b39146d2d867f8744000cab935d062dce6756eac8ad408c72";

    pub fn submission(created_at: u64, content: &str) -> Event {
        Event::new(
            STAFF,
            created_at,
            KIND_ENCRYPTED_DIRECT_MESSAGE,
            vec![vec!["p".into(), SHOP.into()]],
            content,
        )
    }

    pub fn malformed() -> Event {
        let mut event = submission(1, "broken");
        event.id = "not-hex".into();
        event
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn admit_accepts_well_formed_event() {
        assert!(admit(&submission(1_700_000_000, "x")).is_ok());
    }

    #[test]
    fn admit_rejects_bad_id() {
        let rejected = admit(&malformed()).unwrap_err();
        assert_eq!(rejected.id, "not-hex");
    }

    #[test]
    fn admit_rejects_unrepresentable_timestamp() {
        let event = submission(u64::MAX, "x");
        let rejected = admit(&event).unwrap_err();
        assert!(rejected.reason.contains("out of range"));
    }

    #[test]
    fn order_is_newest_first_then_id() {
        let old = submission(1, "old");
        let new = submission(2, "new");
        let mut same = vec![submission(5, "a"), submission(5, "b")];
        same.sort_by(replica_order);
        assert!(same[0].id < same[1].id);

        let mut events = vec![old.clone(), new.clone()];
        events.sort_by(replica_order);
        assert_eq!(events, vec![new, old]);
    }
}
