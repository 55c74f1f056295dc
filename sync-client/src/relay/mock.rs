//! Mock relays for testing.
//!
//! Each relay URL is scripted with the events it holds and how it ends the
//! subscription. The connector records connects and sent frames for
//! verification. Filters are not applied: a scripted relay returns exactly
//! the events it was given, like a relay that ignores part of a filter.

use super::{Connector, RelayConnection, TransportError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use sync_types::{ClientMessage, Event, RelayMessage};

/// How a scripted relay ends a subscription after streaming its events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBehavior {
    /// Send `EOSE`.
    EndOfStoredEvents,
    /// Go silent forever.
    Hang,
    /// Refuse the connection.
    Refuse(String),
    /// Drop the connection without `EOSE`.
    CloseEarly,
    /// Send `CLOSED` with the given reason.
    Closed(String),
    /// Send a frame that is not valid JSON.
    Malformed,
}

#[derive(Debug, Clone)]
enum Scripted {
    Event(Event),
    /// Raw JSON placed where the event object goes.
    Undecodable(String),
}

/// Script for one mock relay.
#[derive(Debug, Clone)]
pub struct MockRelay {
    stream: Vec<Scripted>,
    extra_frames: Vec<String>,
    behavior: MockBehavior,
    delay: Option<Duration>,
}

impl MockRelay {
    /// A relay that holds `events` and ends with `EOSE`.
    pub fn with_events(events: Vec<Event>) -> Self {
        Self {
            stream: events.into_iter().map(Scripted::Event).collect(),
            extra_frames: Vec::new(),
            behavior: MockBehavior::EndOfStoredEvents,
            delay: None,
        }
    }

    /// A relay that holds nothing.
    pub fn empty() -> Self {
        Self::with_events(Vec::new())
    }

    /// Set how the subscription ends.
    pub fn behavior(mut self, behavior: MockBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Wait before sending the first frame.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Append an event to the stream.
    pub fn event(mut self, event: Event) -> Self {
        self.stream.push(Scripted::Event(event));
        self
    }

    /// Append an EVENT frame for the live subscription whose payload is
    /// `payload` verbatim.
    pub fn undecodable_event(mut self, payload: impl Into<String>) -> Self {
        self.stream.push(Scripted::Undecodable(payload.into()));
        self
    }

    /// Send a raw frame ahead of the events (notices, foreign subscriptions).
    pub fn raw_frame(mut self, frame: impl Into<String>) -> Self {
        self.extra_frames.push(frame.into());
        self
    }
}

/// Mock connector serving scripted relays.
///
/// Clones share state, so a test can keep one handle for assertions.
#[derive(Debug, Default, Clone)]
pub struct MockConnector {
    inner: Arc<Mutex<MockConnectorInner>>,
}

#[derive(Debug, Default)]
struct MockConnectorInner {
    relays: HashMap<String, MockRelay>,
    connects: HashMap<String, usize>,
    sent: HashMap<String, Vec<String>>,
}

impl MockConnector {
    /// Create a connector with no relays.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the relay at `url`, replacing any previous script.
    pub fn add_relay(&self, url: &str, relay: MockRelay) {
        self.lock().relays.insert(url.to_string(), relay);
    }

    /// Number of connection attempts made to `url`.
    pub fn connect_count(&self, url: &str) -> usize {
        self.lock().connects.get(url).copied().unwrap_or(0)
    }

    /// Connection attempts across every relay.
    pub fn total_connects(&self) -> usize {
        self.lock().connects.values().sum()
    }

    /// Frames sent to `url`, in order, across all connections.
    pub fn sent_frames(&self, url: &str) -> Vec<String> {
        self.lock().sent.get(url).cloned().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, MockConnectorInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn RelayConnection>, TransportError> {
        let relay = {
            let mut inner = self.lock();
            *inner.connects.entry(url.to_string()).or_default() += 1;
            inner.relays.get(url).cloned()
        };

        match relay {
            None => Err(TransportError::ConnectionFailed(format!(
                "no mock relay at {url}"
            ))),
            Some(MockRelay {
                behavior: MockBehavior::Refuse(reason),
                ..
            }) => Err(TransportError::ConnectionFailed(reason)),
            Some(relay) => Ok(Box::new(MockConnection {
                url: url.to_string(),
                relay,
                connector: self.clone(),
                queue: VecDeque::new(),
                subscribed: false,
                open: true,
            })),
        }
    }
}

enum Frame {
    Text(String),
    Hang,
    Disconnect,
}

struct MockConnection {
    url: String,
    relay: MockRelay,
    connector: MockConnector,
    queue: VecDeque<Frame>,
    subscribed: bool,
    open: bool,
}

impl MockConnection {
    fn script(&mut self, request: ClientMessage) -> Result<(), TransportError> {
        let ClientMessage::Req {
            subscription_id, ..
        } = request
        else {
            return Ok(());
        };

        let encode = |msg: RelayMessage| {
            msg.to_json()
                .map_err(|e| TransportError::Protocol(e.to_string()))
        };

        self.queue
            .extend(self.relay.extra_frames.iter().cloned().map(Frame::Text));
        for entry in &self.relay.stream {
            let frame = match entry {
                Scripted::Event(event) => encode(RelayMessage::Event {
                    subscription_id: subscription_id.clone(),
                    event: Box::new(event.clone()),
                })?,
                Scripted::Undecodable(payload) => {
                    format!(r#"["EVENT","{}",{}]"#, subscription_id.as_str(), payload)
                }
            };
            self.queue.push_back(Frame::Text(frame));
        }

        let terminal = match &self.relay.behavior {
            MockBehavior::EndOfStoredEvents => Frame::Text(encode(RelayMessage::Eose {
                subscription_id,
            })?),
            MockBehavior::Closed(message) => Frame::Text(encode(RelayMessage::Closed {
                subscription_id,
                message: message.clone(),
            })?),
            MockBehavior::Malformed => Frame::Text("{not json".to_string()),
            MockBehavior::CloseEarly => Frame::Disconnect,
            MockBehavior::Hang | MockBehavior::Refuse(_) => Frame::Hang,
        };
        self.queue.push_back(terminal);
        self.subscribed = true;
        Ok(())
    }
}

#[async_trait]
impl RelayConnection for MockConnection {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::ConnectionClosed);
        }
        self.connector
            .lock()
            .sent
            .entry(self.url.clone())
            .or_default()
            .push(frame.clone());

        let request = ClientMessage::from_json(&frame)
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        if !self.subscribed {
            self.script(request)?;
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        if !self.open {
            return Ok(None);
        }
        if let Some(delay) = self.relay.delay.take() {
            tokio::time::sleep(delay).await;
        }
        match self.queue.pop_front() {
            Some(Frame::Text(text)) => Ok(Some(text)),
            Some(Frame::Disconnect) => {
                self.open = false;
                Ok(None)
            }
            // Nothing left to say: a real relay would just keep the socket open.
            Some(Frame::Hang) | None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.open = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_types::{Filter, SubscriptionId};

    const AUTHOR: &str = "d4ed245d98f8867bba709f820e83f65884791076d189e92be0c595f78daf1ccd";

    fn req(sub: &str) -> String {
        ClientMessage::Req {
            subscription_id: SubscriptionId::new(sub),
            filters: vec![Filter::new().kinds([4])],
        }
        .to_json()
        .unwrap()
    }

    fn event(created_at: u64) -> Event {
        Event::new(AUTHOR, created_at, 4, vec![], "x")
    }

    // ===========================================
    // Scripted Relay Tests
    // ===========================================

    #[tokio::test]
    async fn streams_events_then_eose() {
        let connector = MockConnector::new();
        connector.add_relay("wss://a", MockRelay::with_events(vec![event(1), event(2)]));

        let mut conn = connector.connect("wss://a").await.unwrap();
        conn.send(req("sub1")).await.unwrap();

        for _ in 0..2 {
            let frame = conn.recv().await.unwrap().unwrap();
            assert!(matches!(
                RelayMessage::from_json(&frame).unwrap(),
                RelayMessage::Event { .. }
            ));
        }
        let frame = conn.recv().await.unwrap().unwrap();
        assert_eq!(
            RelayMessage::from_json(&frame).unwrap(),
            RelayMessage::Eose {
                subscription_id: SubscriptionId::new("sub1")
            }
        );
    }

    #[tokio::test]
    async fn records_connects_and_frames() {
        let connector = MockConnector::new();
        connector.add_relay("wss://a", MockRelay::empty());

        let mut conn = connector.connect("wss://a").await.unwrap();
        conn.send(req("sub1")).await.unwrap();
        let _second = connector.connect("wss://a").await.unwrap();

        assert_eq!(connector.connect_count("wss://a"), 2);
        assert_eq!(connector.connect_count("wss://b"), 0);
        assert_eq!(connector.total_connects(), 2);
        assert_eq!(connector.sent_frames("wss://a"), vec![req("sub1")]);
    }

    #[tokio::test]
    async fn unknown_and_refusing_relays_fail_to_connect() {
        let connector = MockConnector::new();
        connector.add_relay(
            "wss://down",
            MockRelay::empty().behavior(MockBehavior::Refuse("dns".into())),
        );

        assert!(matches!(
            connector.connect("wss://nowhere").await,
            Err(TransportError::ConnectionFailed(_))
        ));
        assert!(matches!(
            connector.connect("wss://down").await,
            Err(TransportError::ConnectionFailed(reason)) if reason == "dns"
        ));
        assert_eq!(connector.connect_count("wss://down"), 1);
    }

    #[tokio::test]
    async fn close_early_ends_stream() {
        let connector = MockConnector::new();
        connector.add_relay(
            "wss://a",
            MockRelay::with_events(vec![event(1)]).behavior(MockBehavior::CloseEarly),
        );

        let mut conn = connector.connect("wss://a").await.unwrap();
        conn.send(req("s")).await.unwrap();
        assert!(conn.recv().await.unwrap().is_some());
        assert!(conn.recv().await.unwrap().is_none());
        assert!(matches!(
            conn.send(req("s")).await,
            Err(TransportError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn hang_never_yields() {
        let connector = MockConnector::new();
        connector.add_relay("wss://a", MockRelay::empty().behavior(MockBehavior::Hang));

        let mut conn = connector.connect("wss://a").await.unwrap();
        conn.send(req("s")).await.unwrap();

        let result = tokio::time::timeout(Duration::from_millis(20), conn.recv()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn raw_frames_come_first() {
        let connector = MockConnector::new();
        connector.add_relay(
            "wss://a",
            MockRelay::empty().raw_frame(r#"["NOTICE","hello"]"#),
        );

        let mut conn = connector.connect("wss://a").await.unwrap();
        conn.send(req("s")).await.unwrap();
        assert_eq!(
            conn.recv().await.unwrap().as_deref(),
            Some(r#"["NOTICE","hello"]"#)
        );
    }

    // ===========================================
    // Clone and Shared State Tests
    // ===========================================

    #[tokio::test]
    async fn clone_shares_state() {
        let connector = MockConnector::new();
        let observer = connector.clone();
        connector.add_relay("wss://a", MockRelay::empty());

        connector.connect("wss://a").await.unwrap();

        assert_eq!(observer.connect_count("wss://a"), 1);
    }
}
