//! Relay query filters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Event;

/// A NIP-01 filter: which events a relay should return for a subscription.
///
/// Tag constraints are serialized as `"#<letter>"` keys, e.g. `"#p"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Exact event ids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    /// Author public keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,
    /// Event kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kinds: Option<Vec<u32>>,
    /// Tag constraints keyed by `"#<letter>"`.
    #[serde(flatten)]
    pub tags: BTreeMap<String, Vec<String>>,
    /// Lower bound on `created_at` (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<u64>,
    /// Upper bound on `created_at` (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<u64>,
    /// Result-count cap per relay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl Filter {
    /// Create an empty filter (matches everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to the given ids.
    pub fn ids(mut self, ids: impl IntoIterator<Item = String>) -> Self {
        self.ids = Some(ids.into_iter().collect());
        self
    }

    /// Restrict to the given authors.
    pub fn authors(mut self, authors: impl IntoIterator<Item = String>) -> Self {
        self.authors = Some(authors.into_iter().collect());
        self
    }

    /// Restrict to the given kinds.
    pub fn kinds(mut self, kinds: impl IntoIterator<Item = u32>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    /// Require a tag `name` whose value is one of `values`.
    pub fn tag(mut self, name: char, values: impl IntoIterator<Item = String>) -> Self {
        self.tags
            .insert(format!("#{name}"), values.into_iter().collect());
        self
    }

    /// Set the `since` lower bound.
    pub fn since(mut self, since: u64) -> Self {
        self.since = Some(since);
        self
    }

    /// Set the `until` upper bound.
    pub fn until(mut self, until: u64) -> Self {
        self.until = Some(until);
        self
    }

    /// Set the result-count cap.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `event` satisfies every constraint except `limit`.
    ///
    /// Relays are not trusted to apply filters faithfully; callers use this
    /// for their own view-level filtering.
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.iter().any(|id| id == &event.id) {
                return false;
            }
        }
        if let Some(authors) = &self.authors {
            if !authors.iter().any(|a| a == &event.author) {
                return false;
            }
        }
        if let Some(kinds) = &self.kinds {
            if !kinds.contains(&event.kind) {
                return false;
            }
        }
        if self.since.is_some_and(|since| event.created_at < since) {
            return false;
        }
        if self.until.is_some_and(|until| event.created_at > until) {
            return false;
        }
        self.tags.iter().all(|(key, wanted)| {
            let name = key.trim_start_matches('#');
            event
                .tag_values(name)
                .any(|value| wanted.iter().any(|w| w == value))
        })
    }
}
