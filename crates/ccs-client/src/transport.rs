//! Transport seam.
//!
//! The client never opens sockets itself. A [`Transport`] writes outbound
//! stanza bodies and closes the session; everything the transport observes
//! flows back in as [`TransportEvent`]s, either through
//! [`CcsClient::handle_transport_event`](crate::CcsClient::handle_transport_event)
//! or a channel consumed by [`spawn_driver`](crate::spawn_driver).

use std::sync::Arc;

use ccs_core::errors::TransportError;
use ccs_core::outbound::OutboundStanza;

/// Outbound half of a CCS connection.
///
/// Both methods are called while the client holds its internal lock, so
/// implementations must not call back into the client synchronously.
/// Queue a write or push to a channel instead.
pub trait Transport: Send + Sync {
    /// Write one stanza body.
    ///
    /// An error means the stanza was not sent; the client puts the item back
    /// at the front of the queue and treats the connection as lost.
    fn write(&self, stanza: &OutboundStanza) -> Result<(), TransportError>;

    /// Close the session. Called exactly once, after `end()` drains the queue.
    fn close(&self);
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn write(&self, stanza: &OutboundStanza) -> Result<(), TransportError> {
        (**self).write(stanza)
    }

    fn close(&self) {
        (**self).close();
    }
}

/// Something the transport observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// A session was established and authenticated.
    Connected,
    /// The session went away.
    Disconnected,
    /// Connection-level failure.
    Error(TransportError),
    /// JSON text of an inbound stanza.
    Stanza(String),
}

impl TransportEvent {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error(_) => "error",
            Self::Stanza(_) => "stanza",
        }
    }
}
