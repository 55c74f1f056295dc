//! # sync-client
//!
//! Multi-relay sync engine for a local event replica.
//!
//! This is the main library that applications use to keep a replica fresh.
//!
//! ## Features
//!
//! - **Incremental sync**: each pass asks only for events since the replica's
//!   watermark minus an overlap
//! - **Partial-failure tolerance**: a slow or broken relay costs a warning,
//!   never the pass
//! - **Coalescing**: concurrent callers share one in-flight pass
//! - **Transport Abstraction**: WebSocket relays in production, scripted mock
//!   relays in tests
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sync_client::{ReplicaConfig, SyncCoordinator, SyncSettings, WebSocketConnector};
//! use sync_store::SqliteEventStore;
//!
//! let config = ReplicaConfig::from_file("replica.toml".as_ref())?;
//! let store = SqliteEventStore::open(&config.storage.database).await?;
//! let coordinator = SyncCoordinator::new(
//!     Arc::new(store),
//!     Arc::new(WebSocketConnector::new()),
//!     SyncSettings::from(&config),
//! );
//!
//! // Render from cache immediately, refresh in the background
//! let cached = coordinator.read_all().await?;
//! coordinator.spawn_background_sync();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod outcome;
pub mod relay;

pub use config::{ConfigError, ReplicaConfig};
pub use coordinator::{SyncCoordinator, SyncSettings};
pub use error::SyncError;
pub use outcome::{RelayWarning, SyncOutcome, SyncStatus};
pub use relay::{
    Connector, FetchStatus, MockBehavior, MockConnector, MockRelay, RelayClient, RelayConnection,
    RelayFetch, TransportError, WebSocketConnector,
};
