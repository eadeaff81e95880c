//! Downstream send requests and their settled outcomes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::CorrelationId;

/// A notification addressed to one device.
///
/// Created by `send()` and never mutated afterwards. The token and payload
/// are not validated here; the server reports bad values through a nack.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SendRequest {
    /// Registration token of the target device.
    pub recipient_token: String,
    /// Notification body. Object keys are merged into the outbound stanza.
    pub payload: Value,
    /// Echoed by the server in the ack/nack.
    pub correlation_id: CorrelationId,
}

impl SendRequest {
    /// Build a request with a freshly generated correlation ID.
    pub fn new(recipient_token: impl Into<String>, payload: Value) -> Self {
        Self::with_id(recipient_token, payload, CorrelationId::new())
    }

    /// Build a request with a caller-provided correlation ID.
    pub fn with_id(
        recipient_token: impl Into<String>,
        payload: Value,
        correlation_id: CorrelationId,
    ) -> Self {
        Self {
            recipient_token: recipient_token.into(),
            payload,
            correlation_id,
        }
    }
}

/// How the server answered a send.
///
/// A nack still settles the request successfully: it is reported, not
/// retried.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SendOutcome {
    /// The server accepted the message.
    Acked {
        /// The ID the server acknowledged.
        message_id: CorrelationId,
        /// Replacement token when the server reports a canonical registration ID.
        #[serde(skip_serializing_if = "Option::is_none")]
        canonical_token: Option<String>,
    },
    /// The server refused the message.
    Nacked {
        /// The ID the server refused.
        message_id: CorrelationId,
        /// Error code (e.g. `BAD_REGISTRATION`, `DEVICE_MESSAGE_RATE_EXCEEDED`).
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Human-readable description from the server.
        #[serde(skip_serializing_if = "Option::is_none")]
        error_description: Option<String>,
    },
}

impl SendOutcome {
    /// Whether the server accepted the message.
    pub fn is_acked(&self) -> bool {
        matches!(self, Self::Acked { .. })
    }

    /// The correlation ID this outcome settles.
    pub fn message_id(&self) -> &CorrelationId {
        match self {
            Self::Acked { message_id, .. } | Self::Nacked { message_id, .. } => message_id,
        }
    }
}
