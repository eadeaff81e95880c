//! Error types for the CCS client.
//!
//! Three domains, each a [`thiserror`] enum:
//!
//! - [`TransportError`]: connection-level failures reported by the transport.
//!   Fatal to the connection, never to the process.
//! - [`SendError`]: per-request failures delivered through a send's result.
//! - [`FrameError`]: an inbound body that could not be decoded. Never
//!   surfaced to callers; the dispatcher logs and discards.

use std::time::Duration;

use thiserror::Error;

/// Connection-level error raised by the transport.
///
/// Carries string reasons so it stays `Clone` and can be fanned out to
/// every event subscriber.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The server rejected the credentials.
    #[error("authentication failed: {reason}")]
    AuthenticationFailed {
        /// Error description.
        reason: String,
    },
    /// The connection dropped or could not be established.
    #[error("connection lost: {reason}")]
    ConnectionLost {
        /// Error description.
        reason: String,
    },
    /// Writing a stanza failed.
    #[error("write failed: {reason}")]
    WriteFailed {
        /// Error description.
        reason: String,
    },
    /// Any other transport failure.
    #[error("transport error: {reason}")]
    Other {
        /// Error description.
        reason: String,
    },
}

impl TransportError {
    /// Short classification string for logging/metrics.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed { .. } => "authentication_failed",
            Self::ConnectionLost { .. } => "connection_lost",
            Self::WriteFailed { .. } => "write_failed",
            Self::Other { .. } => "other",
        }
    }
}

/// Failure of an individual send.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SendError {
    /// `send` was called after `end`.
    #[error("client is ending; new sends are rejected")]
    Ended,
    /// The client was torn down before the request settled.
    #[error("request discarded before it was acknowledged")]
    Discarded,
    /// No ack or nack arrived within the configured ack timeout.
    #[error("no acknowledgement after {0:?}")]
    AckTimeout(Duration),
    /// Another unsettled request already uses this correlation ID.
    #[error("duplicate message_id {0}")]
    DuplicateId(String),
}

impl SendError {
    /// Short classification string for logging/metrics.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Ended => "ended",
            Self::Discarded => "discarded",
            Self::AckTimeout(_) => "ack_timeout",
            Self::DuplicateId(_) => "duplicate_id",
        }
    }
}

/// An inbound stanza body that could not be decoded.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The body is not valid JSON or a field has the wrong type.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The body is valid JSON but not an object.
    #[error("frame body is not a JSON object")]
    NotAnObject,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_display() {
        let err = TransportError::ConnectionLost {
            reason: "socket closed".into(),
        };
        assert_eq!(err.to_string(), "connection lost: socket closed");
    }

    #[test]
    fn transport_error_kinds() {
        assert_eq!(
            TransportError::AuthenticationFailed { reason: "x".into() }.error_kind(),
            "authentication_failed"
        );
        assert_eq!(
            TransportError::WriteFailed { reason: "x".into() }.error_kind(),
            "write_failed"
        );
    }

    #[test]
    fn send_error_display() {
        assert!(SendError::Ended.to_string().contains("ending"));
        let timeout = SendError::AckTimeout(Duration::from_secs(30));
        assert!(timeout.to_string().contains("30s"));
        assert_eq!(timeout.error_kind(), "ack_timeout");
    }

    #[test]
    fn frame_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad").unwrap_err();
        let err: FrameError = json_err.into();
        assert!(matches!(err, FrameError::Malformed(_)));
        assert!(err.to_string().starts_with("malformed frame"));
    }
}
