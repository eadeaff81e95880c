//! Outbound stanza bodies.
//!
//! The transport wraps each body in the protocol's message element; this
//! module only builds the JSON inside it.
//!
//! Downstream body: `{ "to": <token>, "message_id": <id>, ...payload }`.
//! Object payloads are merged at the root (so callers can pass
//! `notification`, `data`, `time_to_live`, … directly); any other payload is
//! placed under `data`. The routing keys always win over payload keys.

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::send::SendRequest;

/// What an outbound stanza is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundKind {
    /// A notification to a device; occupies an ack slot.
    Downstream,
    /// Acknowledgement of an upstream message or receipt; no slot.
    Ack,
}

/// A JSON body ready to be written by the transport.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutboundStanza {
    /// Purpose of the stanza.
    pub kind: OutboundKind,
    /// JSON body.
    pub body: Value,
}

impl OutboundStanza {
    /// Build the downstream body for a send request.
    pub fn downstream(request: &SendRequest) -> Self {
        let mut root = match &request.payload {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                let _ = map.insert("data".to_owned(), other.clone());
                map
            }
        };
        let _ = root.insert("to".to_owned(), json!(request.recipient_token));
        let _ = root.insert("message_id".to_owned(), json!(request.correlation_id));
        Self {
            kind: OutboundKind::Downstream,
            body: Value::Object(root),
        }
    }

    /// Build the ack the server expects for an upstream message or receipt.
    pub fn ack(to: &str, message_id: &str) -> Self {
        Self {
            kind: OutboundKind::Ack,
            body: json!({
                "to": to,
                "message_id": message_id,
                "message_type": "ack",
            }),
        }
    }

    /// The `message_id` carried by this body.
    pub fn message_id(&self) -> Option<&str> {
        self.body.get("message_id").and_then(Value::as_str)
    }

    /// The `to` field carried by this body.
    pub fn to(&self) -> Option<&str> {
        self.body.get("to").and_then(Value::as_str)
    }

    /// Serialize the body to compact JSON text.
    pub fn to_json_string(&self) -> String {
        self.body.to_string()
    }
}
