//! Unsolicited client events.
//!
//! Send results travel through each send's own future. Everything the
//! caller did not ask for (connection changes, device messages, receipts,
//! error frames) is delivered as a [`ClientEvent`] to every subscriber.

use crate::errors::TransportError;
use crate::frames::{ErrorFrame, Receipt, UpstreamMessage};

/// Event broadcast by the client.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientEvent {
    /// The transport established a session; queued sends start draining.
    Connected,
    /// The transport went away; dispatch holds until the next `Connected`.
    Disconnected,
    /// Transport-level error, forwarded verbatim.
    Error(TransportError),
    /// Device-originated message with a non-empty payload.
    Message(UpstreamMessage),
    /// Delivery receipt.
    Receipt(Receipt),
    /// Protocol-level error frame. Distinct from [`ClientEvent::Error`].
    MessageError(ErrorFrame),
}

impl ClientEvent {
    /// Stable name of the event kind.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error(_) => "error",
            Self::Message(_) => "message",
            Self::Receipt(_) => "receipt",
            Self::MessageError(_) => "message-error",
        }
    }
}
