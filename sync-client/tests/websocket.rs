//! RelayClient over a real WebSocket, against a local relay.

use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use sync_client::{FetchStatus, RelayClient, WebSocketConnector};
use sync_types::{ClientMessage, Event, Filter, RelayMessage};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;

const AUTHOR: &str = "d4ed245d98f8867bba709f820e83f65884791076d189e92be0c595f78daf1ccd";

/// Serve one connection: answer the REQ with `events` then EOSE, and report
/// every text frame the client sent.
async fn spawn_relay(events: Vec<Event>) -> (String, oneshot::Receiver<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let mut received = Vec::new();

        while let Some(Ok(msg)) = ws.next().await {
            let Message::Text(text) = msg else { continue };
            received.push(text.clone());
            match ClientMessage::from_json(&text).unwrap() {
                ClientMessage::Req {
                    subscription_id, ..
                } => {
                    for event in &events {
                        let frame = RelayMessage::Event {
                            subscription_id: subscription_id.clone(),
                            event: Box::new(event.clone()),
                        };
                        ws.send(Message::Text(frame.to_json().unwrap()))
                            .await
                            .unwrap();
                    }
                    let eose = RelayMessage::Eose { subscription_id };
                    ws.send(Message::Text(eose.to_json().unwrap()))
                        .await
                        .unwrap();
                }
                ClientMessage::Close { .. } => break,
            }
        }
        let _ = tx.send(received);
    });

    (format!("ws://{addr}"), rx)
}

#[tokio::test]
async fn fetches_over_websocket() {
    let events = vec![
        Event::new(AUTHOR, 1_700_000_000, 4, vec![], "one"),
        Event::new(AUTHOR, 1_700_000_100, 4, vec![], "two"),
    ];
    let (url, frames) = spawn_relay(events.clone()).await;
    let client = RelayClient::new(Arc::new(WebSocketConnector::new()));

    let fetch = client
        .fetch(&url, &Filter::new().kinds([4]), Duration::from_secs(5))
        .await;

    assert_eq!(fetch.status, FetchStatus::Complete);
    assert_eq!(fetch.events, events);

    let frames = frames.await.unwrap();
    assert_eq!(frames.len(), 2);
    assert!(frames[0].starts_with(r#"["REQ""#));
    assert!(frames[1].starts_with(r#"["CLOSE""#));
}

#[tokio::test]
async fn unreachable_relay_fails_without_panicking() {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = RelayClient::new(Arc::new(WebSocketConnector::new()));
    let fetch = client
        .fetch(&format!("ws://{addr}"), &Filter::new(), Duration::from_secs(5))
        .await;

    assert!(matches!(fetch.status, FetchStatus::Failed(_)));
    assert!(fetch.events.is_empty());
}
