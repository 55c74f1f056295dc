//! Relay transport and single-relay fetch.
//!
//! The transport layer abstracts the connection mechanism so the fetch logic
//! runs unchanged over real WebSockets or a scripted mock.
//!
//! # Design
//!
//! Connections are text-frame oriented:
//! - [`Connector::connect`] opens a connection to a relay URL
//! - [`RelayConnection::send`] transmits one JSON frame
//! - [`RelayConnection::recv`] yields the next JSON frame, `None` once closed
//! - [`RelayConnection::close`] terminates gracefully
//!
//! [`RelayClient`] drives one subscription over a connection and never fails:
//! transport errors surface as a [`FetchStatus`].

mod client;
mod mock;
mod websocket;

pub use client::{FetchStatus, RelayClient, RelayFetch};
pub use mock::{MockBehavior, MockConnector, MockRelay};
pub use websocket::WebSocketConnector;

use async_trait::async_trait;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Relay sent a frame that is not valid protocol.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Relay ended the subscription with `CLOSED`.
    #[error("subscription closed by relay: {0}")]
    SubscriptionClosed(String),
}

/// Opens connections to relays.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to the relay at `url`.
    async fn connect(&self, url: &str) -> Result<Box<dyn RelayConnection>, TransportError>;
}

/// One open relay connection.
#[async_trait]
pub trait RelayConnection: Send {
    /// Send one text frame.
    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Receive the next text frame.
    ///
    /// Returns `Ok(None)` once the relay has closed the connection.
    async fn recv(&mut self) -> Result<Option<String>, TransportError>;

    /// Close the connection gracefully.
    async fn close(&mut self) -> Result<(), TransportError>;
}
