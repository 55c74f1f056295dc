//! Single-relay fetch.
//!
//! One fetch is one subscription on one fresh connection:
//!
//! ```text
//! connect -> REQ -> EVENT* -> EOSE -> CLOSE -> close
//! ```
//!
//! The whole exchange, connect included, runs under one deadline. When the
//! deadline fires the exchange future is dropped, which closes the
//! connection; anything the relay sends afterwards is never read.

use super::{Connector, RelayConnection, TransportError};
use std::sync::Arc;
use std::time::Duration;
use sync_types::{ClientMessage, Event, Filter, RelayMessage, SubscriptionId, SyncError};
use tracing::{debug, info, warn};

/// How a relay fetch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    /// The relay signalled end of stored events.
    Complete,
    /// The deadline fired first.
    TimedOut,
    /// The connection or the protocol exchange failed.
    Failed(String),
}

impl FetchStatus {
    /// Whether the relay delivered its full result set.
    pub fn is_complete(&self) -> bool {
        matches!(self, FetchStatus::Complete)
    }
}

/// Events collected from one relay, with how the fetch ended.
///
/// `events` holds whatever arrived before the end, even on failure.
#[derive(Debug, Clone)]
pub struct RelayFetch {
    /// Relay URL.
    pub relay: String,
    /// Events received for our subscription.
    pub events: Vec<Event>,
    /// EVENT frames for our subscription whose payload did not decode.
    pub skipped: usize,
    /// Completion status.
    pub status: FetchStatus,
}

/// Fetches a filter's result set from a single relay.
#[derive(Clone)]
pub struct RelayClient {
    connector: Arc<dyn Connector>,
}

impl RelayClient {
    /// Create a client over the given connector.
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }

    /// Fetch every event matching `filter` from `url` within `budget`.
    ///
    /// Never fails; the outcome is reported in [`RelayFetch::status`].
    pub async fn fetch(&self, url: &str, filter: &Filter, budget: Duration) -> RelayFetch {
        let subscription_id = SubscriptionId::random();
        let mut events = Vec::new();
        let mut skipped = 0;

        let status = match tokio::time::timeout(
            budget,
            self.exchange(url, &subscription_id, filter, &mut events, &mut skipped),
        )
        .await
        {
            Ok(Ok(())) => FetchStatus::Complete,
            Ok(Err(e)) => FetchStatus::Failed(e.to_string()),
            Err(_) => FetchStatus::TimedOut,
        };

        debug!(
            relay = %url,
            subscription = %subscription_id,
            events = events.len(),
            skipped,
            status = ?status,
            "Relay fetch finished"
        );

        RelayFetch {
            relay: url.to_string(),
            events,
            skipped,
            status,
        }
    }

    async fn exchange(
        &self,
        url: &str,
        subscription_id: &SubscriptionId,
        filter: &Filter,
        events: &mut Vec<Event>,
        skipped: &mut usize,
    ) -> Result<(), TransportError> {
        let mut conn = self.connector.connect(url).await?;

        let request = ClientMessage::Req {
            subscription_id: subscription_id.clone(),
            filters: vec![filter.clone()],
        };
        conn.send(encode(&request)?).await?;

        loop {
            let frame = conn.recv().await?.ok_or(TransportError::ConnectionClosed)?;
            match RelayMessage::from_json(&frame) {
                Ok(RelayMessage::Event {
                    subscription_id: sub,
                    event,
                }) if sub == *subscription_id => events.push(*event),
                Ok(RelayMessage::Eose { subscription_id: sub }) if sub == *subscription_id => {
                    break
                }
                Ok(RelayMessage::Closed {
                    subscription_id: sub,
                    message,
                }) if sub == *subscription_id => {
                    return Err(TransportError::SubscriptionClosed(message))
                }
                Ok(RelayMessage::Notice { message }) => {
                    info!(relay = %url, notice = %message, "Relay notice");
                }
                Ok(other) => {
                    debug!(relay = %url, frame = ?other.subscription_id(), "Ignoring unrelated frame");
                }
                Err(SyncError::UndecodableEvent {
                    subscription_id: sub,
                    reason,
                }) => {
                    if sub == subscription_id.as_str() {
                        *skipped += 1;
                        warn!(relay = %url, reason = %reason, "Skipping undecodable event");
                    }
                }
                Err(SyncError::UnknownMessageType(kind)) => {
                    debug!(relay = %url, kind = %kind, "Ignoring unsupported message type");
                }
                Err(e) => return Err(TransportError::Protocol(e.to_string())),
            }
        }

        close_subscription(conn.as_mut(), subscription_id).await;
        Ok(())
    }
}

fn encode(message: &ClientMessage) -> Result<String, TransportError> {
    message
        .to_json()
        .map_err(|e| TransportError::Protocol(e.to_string()))
}

/// Best-effort `CLOSE` then disconnect; failures here cost nothing.
async fn close_subscription(conn: &mut dyn RelayConnection, subscription_id: &SubscriptionId) {
    let close = ClientMessage::Close {
        subscription_id: subscription_id.clone(),
    };
    if let Ok(frame) = encode(&close) {
        if let Err(e) = conn.send(frame).await {
            debug!(error = %e, "CLOSE not delivered");
        }
    }
    if let Err(e) = conn.close().await {
        debug!(error = %e, "Disconnect failed");
    }
}
