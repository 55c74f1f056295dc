//! Pass results and coordinator status.

use sync_core::PassState;

/// A relay that did not deliver its full result set during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayWarning {
    /// Relay URL.
    pub relay: String,
    /// Why it fell short (timeout, refused, closed).
    pub reason: String,
}

/// Result of one synchronization pass, shared by every caller that waited on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Lower `created_at` bound sent to relays.
    pub since: u64,
    /// Events received across all relays, duplicates included.
    pub fetched: usize,
    /// Distinct events after cross-relay dedup.
    pub unique: usize,
    /// Events new to the local store.
    pub inserted: usize,
    /// Malformed events: undecodable on the wire or refused by the store.
    pub rejected: usize,
    /// Store size after the pass.
    pub stored_count: u64,
    /// Relays that timed out or failed.
    pub warnings: Vec<RelayWarning>,
    /// Unix time the pass committed.
    pub completed_at: u64,
}

impl SyncOutcome {
    /// Whether every relay delivered its full result set.
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Snapshot of the coordinator for status displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    /// Current pass phase.
    pub phase: PassState,
    /// Events in the local store.
    pub cached: u64,
    /// Highest stored `created_at`.
    pub watermark: Option<u64>,
    /// Most recent successful pass, if any since startup.
    pub last_sync: Option<SyncOutcome>,
}

impl SyncStatus {
    /// Whether a pass is running.
    pub fn is_syncing(&self) -> bool {
        self.phase.is_busy()
    }
}
