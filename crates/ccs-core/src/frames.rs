//! Inbound frame classification.
//!
//! The transport hands over the JSON text found inside each inbound stanza.
//! [`InboundFrame::parse`] decodes it and classifies it by the
//! `message_type` discriminator into a closed set of variants. Anything the
//! client does not understand becomes [`InboundFrame::Unknown`], which the
//! dispatcher treats as a no-op.
//!
//! Wire shape (every field optional):
//!
//! ```json
//! { "message_type": "ack" | "nack" | "control" | "receipt" | "upstream" | "error",
//!   "message_id": "…", "from": "…", "control_type": "CONNECTION_DRAINING",
//!   "error": "…", "error_description": "…", "registration_id": "…",
//!   "category": "…", "data": { … } }
//! ```
//!
//! Upstream messages from the live server carry no `message_type` at all;
//! a body with `from` and `data` but no discriminator is classified as
//! upstream.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::FrameError;
use crate::ids::CorrelationId;

/// `control_type` value announcing that the connection is being retired.
pub const CONNECTION_DRAINING: &str = "CONNECTION_DRAINING";

/// A decoded inbound frame.
#[derive(Clone, Debug, PartialEq)]
pub enum InboundFrame {
    /// The server accepted a downstream message.
    Ack(AckFrame),
    /// The server refused a downstream message.
    Nack(NackFrame),
    /// The server asks the client to change send behavior.
    Control(ControlType),
    /// Delivery receipt for a previously sent message.
    Receipt(Receipt),
    /// Device-originated message.
    Upstream(UpstreamMessage),
    /// Protocol-level error frame.
    Error(ErrorFrame),
    /// Empty, type-less, or unrecognized frame.
    Unknown,
}

impl InboundFrame {
    /// Decode and classify a stanza body.
    ///
    /// Returns an error only for bodies that are not a JSON object. An empty
    /// object or an unknown `message_type` yields [`InboundFrame::Unknown`].
    pub fn parse(body: &str) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_str(body)?;
        Self::from_value(value)
    }

    /// Classify an already-decoded body.
    pub fn from_value(value: Value) -> Result<Self, FrameError> {
        let Value::Object(map) = value else {
            return Err(FrameError::NotAnObject);
        };
        if map.is_empty() {
            return Ok(Self::Unknown);
        }
        let body = Value::Object(map);
        let mut raw = RawFrame::deserialize(&body)?;
        let message_type = raw.message_type.take();

        let frame = match message_type.as_deref() {
            Some("ack") => Self::Ack(AckFrame {
                message_id: raw.message_id(),
                from: raw.from,
                registration_id: raw.registration_id,
            }),
            Some("nack") => Self::Nack(NackFrame {
                message_id: raw.message_id(),
                from: raw.from,
                error: raw.error,
                error_description: raw.error_description,
            }),
            Some("control") => match raw.control_type {
                Some(kind) => Self::Control(ControlType::from(kind)),
                None => Self::Unknown,
            },
            Some("receipt") => Self::Receipt(Receipt {
                message_id: raw.message_id_string(),
                from: raw.from,
                category: raw.category,
                data: raw.data.unwrap_or(Value::Null),
                body,
            }),
            Some("upstream") => Self::upstream(raw),
            Some("error") => Self::Error(ErrorFrame {
                message_id: raw.message_id_string(),
                from: raw.from,
                error: raw.error,
                error_description: raw.error_description,
                body,
            }),
            None if raw.from.is_some() && raw.data.is_some() => Self::upstream(raw),
            _ => Self::Unknown,
        };
        Ok(frame)
    }

    fn upstream(raw: RawFrame) -> Self {
        let message_id = raw.message_id_string();
        let data = match raw.data {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        Self::Upstream(UpstreamMessage {
            from: raw.from,
            message_id,
            category: raw.category,
            data,
        })
    }

    /// Wire name of the frame kind, for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ack(_) => "ack",
            Self::Nack(_) => "nack",
            Self::Control(_) => "control",
            Self::Receipt(_) => "receipt",
            Self::Upstream(_) => "upstream",
            Self::Error(_) => "error",
            Self::Unknown => "unknown",
        }
    }
}

/// Fields of interest across every frame kind.
#[derive(Deserialize)]
struct RawFrame {
    #[serde(default)]
    message_type: Option<String>,
    #[serde(default)]
    message_id: Option<Value>,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    control_type: Option<String>,
    #[serde(default)]
    registration_id: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

impl RawFrame {
    /// `message_id` as a string; numeric IDs are accepted and stringified.
    fn message_id_string(&self) -> Option<String> {
        match self.message_id.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn message_id(&self) -> Option<CorrelationId> {
        self.message_id_string().map(CorrelationId::from)
    }
}

/// Positive acknowledgement of a downstream message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AckFrame {
    /// Echoed correlation ID.
    pub message_id: Option<CorrelationId>,
    /// Token the message was addressed to.
    pub from: Option<String>,
    /// Canonical registration ID, when the server reports the token changed.
    pub registration_id: Option<String>,
}

/// Negative acknowledgement of a downstream message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NackFrame {
    /// Echoed correlation ID.
    pub message_id: Option<CorrelationId>,
    /// Token the message was addressed to.
    pub from: Option<String>,
    /// Error code.
    pub error: Option<String>,
    /// Human-readable description.
    pub error_description: Option<String>,
}

/// Sub-type of a `control` frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlType {
    /// The server is retiring the connection; stop sending new messages.
    ConnectionDraining,
    /// A control type this client does not act on.
    Other(String),
}

impl From<String> for ControlType {
    fn from(s: String) -> Self {
        if s == CONNECTION_DRAINING {
            Self::ConnectionDraining
        } else {
            Self::Other(s)
        }
    }
}

/// Delivery receipt.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Receipt {
    /// ID of the receipt frame itself (acked back to the server).
    pub message_id: Option<String>,
    /// Sender of the receipt.
    pub from: Option<String>,
    /// Application category.
    pub category: Option<String>,
    /// Receipt details (`message_status`, `original_message_id`, …).
    pub data: Value,
    /// Full decoded frame body.
    pub body: Value,
}

/// Message originated by a device.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UpstreamMessage {
    /// Registration token of the sending device.
    pub from: Option<String>,
    /// ID assigned by the server (acked back to the server).
    pub message_id: Option<String>,
    /// Application category.
    pub category: Option<String>,
    /// Decoded application payload.
    pub data: Map<String, Value>,
}

/// Protocol-level error frame. Only the common fields are extracted; the
/// full body is kept for callers that need more.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorFrame {
    /// ID the error refers to, if any.
    pub message_id: Option<String>,
    /// Sender.
    pub from: Option<String>,
    /// Error code.
    pub error: Option<String>,
    /// Human-readable description.
    pub error_description: Option<String>,
    /// Full decoded frame body.
    pub body: Value,
}
