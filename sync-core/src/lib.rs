//! # sync-core
//!
//! Pure logic for replica-sync (no I/O, instant tests).
//!
//! This crate implements the state machine and algorithms for syncing a local
//! event replica from several relays, without any network or disk I/O:
//! - [`SyncWindow`] - incremental `since` computation from the store watermark
//! - [`PassState`] - lifecycle of one coalesced synchronization pass
//! - [`MergeSet`] - cross-relay union with id-based deduplication
//! - [`AccessResolver`] - ordered candidate-key attempts for encrypted events
//!
//! The actual I/O (relay connections, the event store) is performed by
//! `sync-client`, which interprets the actions produced here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod access;
pub mod merge;
pub mod pass;
pub mod window;

pub use access::{
    Access, AccessResolver, CandidateKey, DecryptError, DecryptedEvent, Decryptor, KeyRole,
};
pub use merge::MergeSet;
pub use pass::{PassAction, PassEvent, PassState};
pub use window::{SyncWindow, DEFAULT_BOOTSTRAP_SECS, DEFAULT_OVERLAP_SECS};
