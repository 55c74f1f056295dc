//! Synchronization pass state machine.
//!
//! This module provides a pure, side-effect-free state machine for one
//! logical synchronization pass. It takes events as input and produces a new
//! state plus a list of actions to execute.
//!
//! ```text
//! Idle --SyncRequested--> InFlight --(every relay settled)--> Merging --MergeSucceeded/Failed--> Idle
//!                            |                                    |
//!                            +-------------Aborted----------------+--> Idle
//! ```
//!
//! A `SyncRequested` that arrives while a pass is `InFlight` or `Merging`
//! never starts a second pass: it only attaches a waiter. This is what turns
//! N concurrent callers into exactly one fan-out.

/// Pass lifecycle - NO I/O, just state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    /// No pass running.
    Idle,
    /// Relay fetches are running.
    InFlight {
        /// Number of relays the pass fanned out to.
        relays: usize,
        /// Relays that have responded or timed out.
        settled: usize,
    },
    /// All relays settled; results are being written to the store.
    Merging,
}

impl PassState {
    /// Create a new state machine in the Idle state.
    pub fn new() -> Self {
        Self::Idle
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function. The caller (sync-client) is responsible for
    /// executing the returned actions.
    pub fn on_event(self, event: PassEvent) -> (Self, Vec<PassAction>) {
        match (self, event) {
            // From Idle
            (Self::Idle, PassEvent::SyncRequested { relays: 0 }) => (
                Self::Merging,
                vec![
                    PassAction::AttachWaiter,
                    PassAction::StartFanOut,
                    PassAction::Merge,
                ],
            ),
            (Self::Idle, PassEvent::SyncRequested { relays }) => (
                Self::InFlight {
                    relays,
                    settled: 0,
                },
                vec![PassAction::AttachWaiter, PassAction::StartFanOut],
            ),

            // Coalescing: any request during a pass joins it
            (state @ (Self::InFlight { .. } | Self::Merging), PassEvent::SyncRequested { .. }) => {
                (state, vec![PassAction::AttachWaiter])
            }

            // From InFlight
            (Self::InFlight { relays, settled }, PassEvent::RelaySettled) => {
                let settled = settled.saturating_add(1).min(relays);
                if settled == relays {
                    (Self::Merging, vec![PassAction::Merge])
                } else {
                    (Self::InFlight { relays, settled }, vec![])
                }
            }

            // From Merging
            (Self::Merging, PassEvent::MergeSucceeded) => (
                Self::Idle,
                vec![PassAction::ResolveWaiters { success: true }],
            ),
            (Self::Merging, PassEvent::MergeFailed) => (
                Self::Idle,
                vec![PassAction::ResolveWaiters { success: false }],
            ),

            // A pass can die before reaching the merge (watermark read failed)
            (Self::InFlight { .. } | Self::Merging, PassEvent::Aborted) => (
                Self::Idle,
                vec![PassAction::ResolveWaiters { success: false }],
            ),

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Check if no pass is running.
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Check if a pass is running (fetching or merging).
    pub fn is_busy(&self) -> bool {
        !self.is_idle()
    }
}

impl Default for PassState {
    fn default() -> Self {
        Self::new()
    }
}

/// Events that can occur during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassEvent {
    /// A caller asked for a sync.
    SyncRequested {
        /// Number of configured relays.
        relays: usize,
    },
    /// One relay fetch finished (successfully, partially, or by timeout).
    RelaySettled,
    /// The merged events were written to the store.
    MergeSucceeded,
    /// Writing to the store failed.
    MergeFailed,
    /// The pass failed outside the merge step.
    Aborted,
}

/// Actions to be executed by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassAction {
    /// Register the requesting caller as a waiter on the current pass.
    AttachWaiter,
    /// Launch one fetch per relay.
    StartFanOut,
    /// Deduplicate collected events and upsert them.
    Merge,
    /// Hand the pass result to every attached waiter.
    ResolveWaiters {
        /// Whether the merge committed.
        success: bool,
    },
}
