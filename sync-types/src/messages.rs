//! Relay protocol frames.
//!
//! Frames are JSON arrays whose first element names the message type
//! (NIP-01):
//! - Client to relay: `REQ`, `CLOSE`
//! - Relay to client: `EVENT`, `EOSE`, `CLOSED`, `NOTICE`, `OK`

use serde_json::Value;

use crate::{Event, Filter, SubscriptionId, SyncError};

/// Frames sent from client to relay.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Open a subscription: `["REQ", <sub_id>, <filter>...]`
    Req {
        /// Subscription the relay will tag its responses with.
        subscription_id: SubscriptionId,
        /// One or more filters (OR-ed by the relay).
        filters: Vec<Filter>,
    },
    /// Close a subscription: `["CLOSE", <sub_id>]`
    Close {
        /// Subscription to close.
        subscription_id: SubscriptionId,
    },
}

impl ClientMessage {
    /// Serialize to the JSON text frame.
    pub fn to_json(&self) -> Result<String, SyncError> {
        let value = match self {
            ClientMessage::Req {
                subscription_id,
                filters,
            } => {
                let mut arr = vec![
                    Value::String("REQ".into()),
                    Value::String(subscription_id.as_str().into()),
                ];
                for filter in filters {
                    arr.push(serde_json::to_value(filter)?);
                }
                Value::Array(arr)
            }
            ClientMessage::Close { subscription_id } => {
                serde_json::json!(["CLOSE", subscription_id.as_str()])
            }
        };
        Ok(value.to_string())
    }

    /// Parse a client frame (used by test relays).
    pub fn from_json(text: &str) -> Result<Self, SyncError> {
        let arr = parse_array(text)?;
        match message_type(&arr)? {
            "REQ" => {
                let subscription_id = string_at(&arr, 1, "subscription id")?;
                let filters = arr[2..]
                    .iter()
                    .map(|f| serde_json::from_value(f.clone()))
                    .collect::<Result<Vec<Filter>, _>>()?;
                Ok(ClientMessage::Req {
                    subscription_id: SubscriptionId::new(subscription_id),
                    filters,
                })
            }
            "CLOSE" => Ok(ClientMessage::Close {
                subscription_id: SubscriptionId::new(string_at(&arr, 1, "subscription id")?),
            }),
            other => Err(SyncError::UnknownMessageType(other.to_string())),
        }
    }
}

/// Frames sent from relay to client.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayMessage {
    /// Stored or live event: `["EVENT", <sub_id>, <event>]`
    Event {
        /// Subscription this event answers.
        subscription_id: SubscriptionId,
        /// The event itself.
        event: Box<Event>,
    },
    /// End of stored events: `["EOSE", <sub_id>]`
    Eose {
        /// Subscription that finished replaying stored events.
        subscription_id: SubscriptionId,
    },
    /// Subscription refused or terminated by the relay: `["CLOSED", <sub_id>, <message>]`
    Closed {
        /// Subscription that was closed.
        subscription_id: SubscriptionId,
        /// Relay-provided reason.
        message: String,
    },
    /// Human-readable notice: `["NOTICE", <message>]`
    Notice {
        /// Notice text.
        message: String,
    },
    /// Publish result: `["OK", <event_id>, <accepted>, <message>]`
    Ok {
        /// Event the result refers to.
        event_id: String,
        /// Whether the relay accepted the event.
        accepted: bool,
        /// Relay-provided detail.
        message: String,
    },
}

impl RelayMessage {
    /// Parse a relay frame.
    pub fn from_json(text: &str) -> Result<Self, SyncError> {
        let arr = parse_array(text)?;
        match message_type(&arr)? {
            "EVENT" => {
                let subscription_id = SubscriptionId::new(string_at(&arr, 1, "subscription id")?);
                // A bad payload is the event's problem, not the frame's.
                let undecodable = |reason: String| SyncError::UndecodableEvent {
                    subscription_id: subscription_id.as_str().to_string(),
                    reason,
                };
                let raw = arr
                    .get(2)
                    .ok_or_else(|| undecodable("EVENT without event".into()))?;
                let event: Event = serde_json::from_value(raw.clone())
                    .map_err(|e| undecodable(e.to_string()))?;
                Ok(RelayMessage::Event {
                    subscription_id,
                    event: Box::new(event),
                })
            }
            "EOSE" => Ok(RelayMessage::Eose {
                subscription_id: SubscriptionId::new(string_at(&arr, 1, "subscription id")?),
            }),
            "CLOSED" => Ok(RelayMessage::Closed {
                subscription_id: SubscriptionId::new(string_at(&arr, 1, "subscription id")?),
                message: arr.get(2).and_then(Value::as_str).unwrap_or("").to_string(),
            }),
            "NOTICE" => Ok(RelayMessage::Notice {
                message: string_at(&arr, 1, "notice message")?,
            }),
            "OK" => {
                let event_id = string_at(&arr, 1, "event id")?;
                let accepted = arr.get(2).and_then(Value::as_bool).ok_or_else(|| {
                    SyncError::InvalidMessage("OK accepted flag not a boolean".into())
                })?;
                Ok(RelayMessage::Ok {
                    event_id,
                    accepted,
                    message: arr.get(3).and_then(Value::as_str).unwrap_or("").to_string(),
                })
            }
            other => Err(SyncError::UnknownMessageType(other.to_string())),
        }
    }

    /// Serialize to the JSON text frame (used by test relays).
    pub fn to_json(&self) -> Result<String, SyncError> {
        let value = match self {
            RelayMessage::Event {
                subscription_id,
                event,
            } => serde_json::json!(["EVENT", subscription_id.as_str(), event]),
            RelayMessage::Eose { subscription_id } => {
                serde_json::json!(["EOSE", subscription_id.as_str()])
            }
            RelayMessage::Closed {
                subscription_id,
                message,
            } => serde_json::json!(["CLOSED", subscription_id.as_str(), message]),
            RelayMessage::Notice { message } => serde_json::json!(["NOTICE", message]),
            RelayMessage::Ok {
                event_id,
                accepted,
                message,
            } => serde_json::json!(["OK", event_id, accepted, message]),
        };
        Ok(value.to_string())
    }

    /// Subscription this frame belongs to, if any.
    pub fn subscription_id(&self) -> Option<&SubscriptionId> {
        match self {
            RelayMessage::Event {
                subscription_id, ..
            }
            | RelayMessage::Eose { subscription_id }
            | RelayMessage::Closed {
                subscription_id, ..
            } => Some(subscription_id),
            RelayMessage::Notice { .. } | RelayMessage::Ok { .. } => None,
        }
    }
}

fn parse_array(text: &str) -> Result<Vec<Value>, SyncError> {
    match serde_json::from_str::<Value>(text)? {
        Value::Array(arr) if !arr.is_empty() => Ok(arr),
        Value::Array(_) => Err(SyncError::InvalidMessage("empty array".into())),
        _ => Err(SyncError::InvalidMessage("frame is not a JSON array".into())),
    }
}

fn message_type(arr: &[Value]) -> Result<&str, SyncError> {
    arr[0]
        .as_str()
        .ok_or_else(|| SyncError::InvalidMessage("first element not a string".into()))
}

fn string_at(arr: &[Value], index: usize, what: &str) -> Result<String, SyncError> {
    arr.get(index)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| SyncError::InvalidMessage(format!("missing or non-string {what}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KIND_ENCRYPTED_DIRECT_MESSAGE;

    const AUTHOR: &str = "4287e0cdcccb4789f0c1d4c27caae092f19f0c266c0d0638b571558d09317911";

    fn sample_event() -> Event {
        Event::new(AUTHOR, 1_700_000_000, KIND_ENCRYPTED_DIRECT_MESSAGE, vec![], "x")
    }

    #[test]
    fn req_serializes_as_array() {
        let msg = ClientMessage::Req {
            subscription_id: SubscriptionId::new("abc"),
            filters: vec![Filter::new().kinds([4]).since(10)],
        };
        let json = msg.to_json().unwrap();
        assert_eq!(json, r#"["REQ","abc",{"kinds":[4],"since":10}]"#);
    }

    #[test]
    fn req_parses_back() {
        let msg = ClientMessage::Req {
            subscription_id: SubscriptionId::new("abc"),
            filters: vec![Filter::new().tag('p', [AUTHOR.to_string()]).limit(5)],
        };
        let parsed = ClientMessage::from_json(&msg.to_json().unwrap()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn close_serializes() {
        let msg = ClientMessage::Close {
            subscription_id: SubscriptionId::new("abc"),
        };
        assert_eq!(msg.to_json().unwrap(), r#"["CLOSE","abc"]"#);
    }

    #[test]
    fn parses_event_frame() {
        let event = sample_event();
        let text = serde_json::json!(["EVENT", "sub1", event]).to_string();
        match RelayMessage::from_json(&text).unwrap() {
            RelayMessage::Event {
                subscription_id,
                event: parsed,
            } => {
                assert_eq!(subscription_id.as_str(), "sub1");
                assert_eq!(*parsed, event);
            }
            other => panic!("expected EVENT, got {:?}", other),
        }
    }

    #[test]
    fn parses_eose_closed_notice_ok() {
        assert_eq!(
            RelayMessage::from_json(r#"["EOSE","sub1"]"#).unwrap(),
            RelayMessage::Eose {
                subscription_id: SubscriptionId::new("sub1")
            }
        );
        assert_eq!(
            RelayMessage::from_json(r#"["CLOSED","sub1","rate-limited: slow down"]"#).unwrap(),
            RelayMessage::Closed {
                subscription_id: SubscriptionId::new("sub1"),
                message: "rate-limited: slow down".into(),
            }
        );
        assert_eq!(
            RelayMessage::from_json(r#"["NOTICE","hello"]"#).unwrap(),
            RelayMessage::Notice {
                message: "hello".into()
            }
        );
        assert!(matches!(
            RelayMessage::from_json(r#"["OK","ab",true,""]"#).unwrap(),
            RelayMessage::Ok { accepted: true, .. }
        ));
    }

    #[test]
    fn relay_frames_round_trip_through_text() {
        let frames = vec![
            RelayMessage::Event {
                subscription_id: SubscriptionId::new("s"),
                event: Box::new(sample_event()),
            },
            RelayMessage::Eose {
                subscription_id: SubscriptionId::new("s"),
            },
            RelayMessage::Notice {
                message: "n".into(),
            },
        ];
        for frame in frames {
            let text = frame.to_json().unwrap();
            assert_eq!(RelayMessage::from_json(&text).unwrap(), frame);
        }
    }

    #[test]
    fn rejects_malformed_frames() {
        assert!(matches!(
            RelayMessage::from_json("not json"),
            Err(SyncError::Json(_))
        ));
        assert!(matches!(
            RelayMessage::from_json("[]"),
            Err(SyncError::InvalidMessage(_))
        ));
        assert!(matches!(
            RelayMessage::from_json(r#"{"EVENT":1}"#),
            Err(SyncError::InvalidMessage(_))
        ));
        assert!(matches!(
            RelayMessage::from_json(r#"["EVENT",3]"#),
            Err(SyncError::InvalidMessage(_))
        ));
        assert!(matches!(
            RelayMessage::from_json(r#"["BOGUS"]"#),
            Err(SyncError::UnknownMessageType(_))
        ));
        assert!(matches!(
            RelayMessage::from_json(r#"["EOSE",7]"#),
            Err(SyncError::InvalidMessage(_))
        ));
    }

    #[test]
    fn bad_event_payload_keeps_subscription_id() {
        let negative_timestamp =
            r#"["EVENT","sub1",{"id":"zz","pubkey":"p","created_at":-5,"kind":4,"tags":[],"content":"","sig":"s"}]"#;
        let bad_tag =
            r#"["EVENT","sub1",{"id":"zz","pubkey":"p","created_at":5,"kind":4,"tags":[[1]],"content":"","sig":"s"}]"#;

        for frame in [negative_timestamp, bad_tag, r#"["EVENT","sub1"]"#] {
            match RelayMessage::from_json(frame) {
                Err(SyncError::UndecodableEvent {
                    subscription_id, ..
                }) => assert_eq!(subscription_id, "sub1"),
                other => panic!("expected UndecodableEvent, got {:?}", other),
            }
        }
    }

    #[test]
    fn subscription_id_accessor() {
        let eose = RelayMessage::Eose {
            subscription_id: SubscriptionId::new("x"),
        };
        assert_eq!(eose.subscription_id().map(|s| s.as_str()), Some("x"));
        let notice = RelayMessage::Notice {
            message: "n".into(),
        };
        assert!(notice.subscription_id().is_none());
    }
}
