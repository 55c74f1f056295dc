//! # sync-types
//!
//! Wire format types for replica-sync.
//!
//! This crate provides the foundational types used across all replica-sync crates:
//! - [`Event`] - The immutable, signed record that gets replicated
//! - [`Filter`] - Relay query description (authors, kinds, tags, since)
//! - [`SubscriptionId`] - Per-request subscription identifier
//! - [`ClientMessage`], [`RelayMessage`] - Relay protocol frames (NIP-01 JSON arrays)
//! - [`SyncError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod event;
mod filter;
mod ids;
mod messages;

pub use error::SyncError;
pub use event::{
    Event, KIND_APPLICATION_DATA, KIND_ENCRYPTED_DIRECT_MESSAGE, KIND_METADATA,
};
pub use filter::Filter;
pub use ids::SubscriptionId;
pub use messages::{ClientMessage, RelayMessage};
