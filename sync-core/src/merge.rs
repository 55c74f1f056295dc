//! Cross-relay merge.
//!
//! Relays return overlapping, unordered, possibly duplicated result sets. The
//! merge unions them keyed by event id: the first copy seen wins and later
//! copies only bump a sighting counter. Ordering is left to the store.

use std::collections::HashMap;
use sync_types::Event;

/// Union of relay results, deduplicated by event id.
#[derive(Debug, Clone, Default)]
pub struct MergeSet {
    events: Vec<Event>,
    index: HashMap<String, usize>,
    sightings: Vec<usize>,
    received: usize,
}

impl MergeSet {
    /// Create an empty merge set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one relay's results. Returns how many ids were new to the set.
    pub fn extend(&mut self, events: impl IntoIterator<Item = Event>) -> usize {
        let mut added = 0;
        for event in events {
            self.received += 1;
            match self.index.get(&event.id) {
                Some(&slot) => self.sightings[slot] += 1,
                None => {
                    self.index.insert(event.id.clone(), self.events.len());
                    self.events.push(event);
                    self.sightings.push(1);
                    added += 1;
                }
            }
        }
        added
    }

    /// Number of distinct events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events were collected.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Total events received across all relays, duplicates included.
    pub fn received(&self) -> usize {
        self.received
    }

    /// How many times an id was delivered (0 if never).
    pub fn sightings(&self, id: &str) -> usize {
        self.index
            .get(id)
            .map(|&slot| self.sightings[slot])
            .unwrap_or(0)
    }

    /// Whether the set contains an id.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Borrow the distinct events in first-seen order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Consume the set, yielding distinct events in first-seen order.
    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}
