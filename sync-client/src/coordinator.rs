//! SyncCoordinator - multi-relay synchronization with request coalescing.
//!
//! # Architecture
//!
//! The coordinator uses the pure pass state machine from sync-core and
//! interprets its actions to perform the actual I/O:
//!
//! ```text
//! callers ─request_sync─▶ SyncCoordinator ─fetch─▶ RelayClient × N
//!                              │                        │
//!                     sync-core PassState          MergeSet ─▶ EventStore
//! ```
//!
//! Phase and waiter list live under one mutex. A request attaches its waiter
//! and, when idle, spawns the pass in the same critical section; the pass
//! drains the waiters and returns to idle in another. No request can slip
//! between "pass finished" and "waiter attached".
//!
//! The pass runs on its own task, so a caller that stops waiting never
//! strands the others.

use futures_util::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use sync_core::{
    AccessResolver, CandidateKey, DecryptedEvent, MergeSet, PassAction, PassEvent, PassState,
    SyncWindow,
};
use sync_store::EventStore;
use sync_types::{Event, Filter};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::ReplicaConfig;
use crate::error::SyncError;
use crate::outcome::{RelayWarning, SyncOutcome, SyncStatus};
use crate::relay::{Connector, FetchStatus, RelayClient};

type PassResult = Result<SyncOutcome, SyncError>;

/// What a pass fetches and from where.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Relay URLs.
    pub relays: Vec<String>,
    /// Filter sent to every relay; `since` is filled in per pass.
    pub filter: Filter,
    /// Overlap and bootstrap parameters.
    pub window: SyncWindow,
    /// Per-relay fetch budget.
    pub relay_timeout: Duration,
}

impl From<&ReplicaConfig> for SyncSettings {
    fn from(config: &ReplicaConfig) -> Self {
        Self {
            relays: config.relays.urls.clone(),
            filter: config.base_filter(),
            window: config.sync_window(),
            relay_timeout: config.relay_timeout(),
        }
    }
}

/// Keeps a local replica in sync with a set of relays.
///
/// Cheap to clone; clones share one replica and one pass at a time.
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn EventStore>,
    relay_client: RelayClient,
    settings: SyncSettings,
    state: Mutex<Coordination>,
}

#[derive(Default)]
struct Coordination {
    phase: PassState,
    waiters: Vec<oneshot::Sender<PassResult>>,
    last_sync: Option<SyncOutcome>,
}

impl SyncCoordinator {
    /// Create a coordinator over `store`, reaching relays through `connector`.
    pub fn new(
        store: Arc<dyn EventStore>,
        connector: Arc<dyn Connector>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                relay_client: RelayClient::new(connector),
                settings,
                state: Mutex::new(Coordination::default()),
            }),
        }
    }

    /// Run a sync pass, or join the one already running.
    ///
    /// Every caller attached to a pass receives the same outcome. Relay
    /// failures are reported as warnings; only a storage failure is an error.
    pub async fn request_sync(&self) -> Result<SyncOutcome, SyncError> {
        let (tx, rx) = oneshot::channel();
        let mut waiter = Some(tx);
        let mut start = false;
        let mut merge_ready = false;

        {
            let mut state = self.inner.state.lock().await;
            let (phase, actions) = state.phase.on_event(PassEvent::SyncRequested {
                relays: self.inner.settings.relays.len(),
            });
            state.phase = phase;

            for action in actions {
                match action {
                    PassAction::AttachWaiter => {
                        if let Some(tx) = waiter.take() {
                            state.waiters.push(tx);
                        }
                    }
                    PassAction::StartFanOut => start = true,
                    // With no relays the fan-out settles immediately.
                    PassAction::Merge => merge_ready = true,
                    PassAction::ResolveWaiters { .. } => {}
                }
            }
            if start {
                tokio::spawn(Inner::run_pass(Arc::clone(&self.inner), merge_ready));
            }
        }

        rx.await.unwrap_or_else(|_| {
            Err(SyncError::Coordinator(
                "sync pass ended without a result".into(),
            ))
        })
    }

    /// Start a pass without waiting for it; the outcome is only logged.
    pub fn spawn_background_sync(&self) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            match coordinator.request_sync().await {
                Ok(outcome) => info!(
                    inserted = outcome.inserted,
                    stored = outcome.stored_count,
                    warnings = outcome.warnings.len(),
                    "Background sync finished"
                ),
                Err(e) => warn!(error = %e, "Background sync failed"),
            }
        })
    }

    /// Every cached event, most recent first. Never touches the network.
    pub async fn read_all(&self) -> Result<Vec<Event>, SyncError> {
        Ok(self.inner.store.get_all().await?)
    }

    /// Every cached event with decryption attempted against `keys`.
    ///
    /// Events no key opens are kept as [`Access::Locked`](sync_core::Access::Locked).
    pub async fn read_all_decrypted(
        &self,
        resolver: &AccessResolver,
        keys: &[CandidateKey],
    ) -> Result<Vec<DecryptedEvent>, SyncError> {
        let events = self.read_all().await?;
        Ok(resolver.resolve_all(events, keys))
    }

    /// Current phase, cache size and last successful pass.
    pub async fn status(&self) -> Result<SyncStatus, SyncError> {
        let (phase, last_sync) = {
            let state = self.inner.state.lock().await;
            (state.phase, state.last_sync.clone())
        };
        Ok(SyncStatus {
            phase,
            cached: self.inner.store.count().await?,
            watermark: self.inner.store.latest_timestamp().await?,
            last_sync,
        })
    }

    /// The settings passes run with.
    pub fn settings(&self) -> &SyncSettings {
        &self.inner.settings
    }
}

impl Inner {
    async fn run_pass(self: Arc<Self>, merge_ready: bool) {
        let worker = tokio::spawn(Arc::clone(&self).execute_pass(merge_ready));
        let result = match worker.await {
            Ok(result) => result,
            Err(e) => Err(SyncError::Coordinator(format!("sync pass task failed: {e}"))),
        };
        self.finish(result).await;
    }

    async fn execute_pass(self: Arc<Self>, mut merge_ready: bool) -> PassResult {
        let settings = &self.settings;
        let watermark = self.store.latest_timestamp().await?;
        let since = settings.window.since(watermark, unix_now());
        let filter = settings.filter.clone().since(since);

        info!(
            relays = settings.relays.len(),
            since,
            watermark = ?watermark,
            "Starting sync pass"
        );

        let mut fetches: FuturesUnordered<_> = settings
            .relays
            .iter()
            .map(|url| {
                self.relay_client
                    .fetch(url, &filter, settings.relay_timeout)
            })
            .collect();

        let mut merged = MergeSet::new();
        let mut warnings = Vec::new();
        let mut undecodable = 0;
        while let Some(fetch) = fetches.next().await {
            let reason = match fetch.status {
                FetchStatus::Complete => None,
                FetchStatus::TimedOut => Some(format!(
                    "timed out after {:?}",
                    settings.relay_timeout
                )),
                FetchStatus::Failed(reason) => Some(reason),
            };
            if let Some(reason) = reason {
                warn!(
                    relay = %fetch.relay,
                    reason = %reason,
                    partial = fetch.events.len(),
                    "Relay did not complete"
                );
                warnings.push(RelayWarning {
                    relay: fetch.relay,
                    reason,
                });
            }
            undecodable += fetch.skipped;
            merged.extend(fetch.events);
            let actions = self.apply(PassEvent::RelaySettled).await;
            merge_ready |= actions.contains(&PassAction::Merge);
        }

        if !merge_ready {
            return Err(SyncError::Coordinator(
                "relays settled but the pass never reached the merge".into(),
            ));
        }

        let summary = self.store.upsert_many(merged.events()).await?;
        let stored_count = self.store.count().await?;

        Ok(SyncOutcome {
            since,
            fetched: merged.received(),
            unique: merged.len(),
            inserted: summary.inserted,
            rejected: summary.rejected.len() + undecodable,
            stored_count,
            warnings,
            completed_at: unix_now(),
        })
    }

    async fn apply(&self, event: PassEvent) -> Vec<PassAction> {
        let mut state = self.state.lock().await;
        let (phase, actions) = state.phase.on_event(event);
        state.phase = phase;
        actions
    }

    /// Return to idle and hand the result to every attached waiter.
    async fn finish(&self, result: PassResult) {
        let waiters = {
            let mut state = self.state.lock().await;
            let event = match (&result, state.phase) {
                (Ok(_), _) => PassEvent::MergeSucceeded,
                (Err(_), PassState::Merging) => PassEvent::MergeFailed,
                (Err(_), _) => PassEvent::Aborted,
            };
            let (phase, actions) = state.phase.on_event(event);
            state.phase = phase;

            let mut waiters = Vec::new();
            for action in actions {
                if let PassAction::ResolveWaiters { success } = action {
                    if let (true, Ok(outcome)) = (success, &result) {
                        state.last_sync = Some(outcome.clone());
                    }
                    waiters = std::mem::take(&mut state.waiters);
                }
            }
            waiters
        };

        match &result {
            Ok(outcome) => info!(
                waiters = waiters.len(),
                fetched = outcome.fetched,
                unique = outcome.unique,
                inserted = outcome.inserted,
                stored = outcome.stored_count,
                warnings = outcome.warnings.len(),
                "Sync pass complete"
            ),
            Err(e) => error!(waiters = waiters.len(), error = %e, "Sync pass failed"),
        }

        for waiter in waiters {
            // A waiter that gave up has dropped its receiver.
            let _ = waiter.send(result.clone());
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
