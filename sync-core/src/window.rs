//! Incremental sync window.
//!
//! The watermark is the highest `created_at` in the local store. The next
//! fetch asks relays for everything since `watermark - overlap`, relying on
//! id-based dedup to absorb the re-fetched overlap. An empty store falls back
//! to a long bootstrap lookback from the current time.
//!
//! `created_at` is signer-asserted, so the overlap must cover typical clock
//! skew plus relay propagation delay.

/// Default overlap re-fetched behind the watermark (1 hour).
pub const DEFAULT_OVERLAP_SECS: u64 = 60 * 60;

/// Default lookback for an empty replica (90 days).
pub const DEFAULT_BOOTSTRAP_SECS: u64 = 90 * 24 * 60 * 60;

/// Overlap and bootstrap parameters for computing a pass's `since`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    overlap_secs: u64,
    bootstrap_secs: u64,
}

impl SyncWindow {
    /// Create a window with explicit parameters.
    pub fn new(overlap_secs: u64, bootstrap_secs: u64) -> Self {
        Self {
            overlap_secs,
            bootstrap_secs,
        }
    }

    /// Overlap in seconds.
    pub fn overlap_secs(&self) -> u64 {
        self.overlap_secs
    }

    /// Bootstrap lookback in seconds.
    pub fn bootstrap_secs(&self) -> u64 {
        self.bootstrap_secs
    }

    /// Compute the `since` bound for the next pass.
    ///
    /// `watermark` is the store's latest `created_at` (None when empty) and
    /// `now` the current Unix time. The result never exceeds the watermark.
    pub fn since(&self, watermark: Option<u64>, now: u64) -> u64 {
        match watermark {
            Some(latest) => latest.saturating_sub(self.overlap_secs),
            None => now.saturating_sub(self.bootstrap_secs),
        }
    }
}

impl Default for SyncWindow {
    fn default() -> Self {
        Self::new(DEFAULT_OVERLAP_SECS, DEFAULT_BOOTSTRAP_SECS)
    }
}
