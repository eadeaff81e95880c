//! Inbound frame routing.
//!
//! [`route`] turns one decoded frame into the single action the session
//! must take. It has no state; the session applies the action against the
//! queue, tracker and event emitter.

use ccs_core::events::ClientEvent;
use ccs_core::frames::{ControlType, InboundFrame};
use ccs_core::ids::CorrelationId;
use ccs_core::outbound::OutboundStanza;
use ccs_core::send::SendOutcome;

/// What to do with an inbound frame.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameAction {
    /// Settle the in-flight item with this ID.
    Settle {
        /// Correlation ID from the frame.
        message_id: CorrelationId,
        /// Result handed to the waiting caller.
        outcome: SendOutcome,
    },
    /// Stop dispatching new messages on this connection.
    Pause,
    /// Broadcast an event, optionally acknowledging the frame first.
    Emit {
        /// Event for subscribers.
        event: ClientEvent,
        /// Ack the server expects for this frame.
        ack: Option<OutboundStanza>,
    },
    /// Drop the frame.
    Discard {
        /// Short reason, used as a log field and metric label.
        reason: &'static str,
    },
}

/// Decode a stanza body and route it. Undecodable bodies are discarded.
pub fn route_text(body: &str) -> FrameAction {
    match InboundFrame::parse(body) {
        Ok(frame) => route(frame),
        Err(error) => {
            tracing::debug!(%error, "undecodable frame");
            FrameAction::Discard {
                reason: "malformed",
            }
        }
    }
}

/// Route a decoded frame.
pub fn route(frame: InboundFrame) -> FrameAction {
    match frame {
        InboundFrame::Ack(ack) => match ack.message_id {
            Some(message_id) => FrameAction::Settle {
                outcome: SendOutcome::Acked {
                    message_id: message_id.clone(),
                    canonical_token: ack.registration_id,
                },
                message_id,
            },
            None => FrameAction::Discard {
                reason: "ack_without_id",
            },
        },
        InboundFrame::Nack(nack) => match nack.message_id {
            Some(message_id) => FrameAction::Settle {
                outcome: SendOutcome::Nacked {
                    message_id: message_id.clone(),
                    error: nack.error,
                    error_description: nack.error_description,
                },
                message_id,
            },
            None => FrameAction::Discard {
                reason: "nack_without_id",
            },
        },
        InboundFrame::Control(ControlType::ConnectionDraining) => FrameAction::Pause,
        InboundFrame::Control(ControlType::Other(_)) => FrameAction::Discard {
            reason: "unhandled_control",
        },
        InboundFrame::Receipt(receipt) => {
            let ack = ack_for(receipt.from.as_deref(), receipt.message_id.as_deref());
            FrameAction::Emit {
                event: ClientEvent::Receipt(receipt),
                ack,
            }
        }
        InboundFrame::Upstream(message) if message.data.is_empty() => FrameAction::Discard {
            reason: "empty_upstream",
        },
        InboundFrame::Upstream(message) => {
            let ack = ack_for(message.from.as_deref(), message.message_id.as_deref());
            FrameAction::Emit {
                event: ClientEvent::Message(message),
                ack,
            }
        }
        InboundFrame::Error(error) => FrameAction::Emit {
            event: ClientEvent::MessageError(error),
            ack: None,
        },
        InboundFrame::Unknown => FrameAction::Discard { reason: "unknown" },
    }
}

fn ack_for(from: Option<&str>, message_id: Option<&str>) -> Option<OutboundStanza> {
    Some(OutboundStanza::ack(from?, message_id?))
}
