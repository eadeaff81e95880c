//! Public client façade.
//!
//! [`CcsClient`] is a cheap handle (`Clone`) over shared state: the
//! [`Session`] behind a single lock, the transport, and the event emitter.
//! Session operations run under the lock; events are broadcast after it is
//! released.

use std::sync::{Arc, Weak};

use ccs_core::errors::SendError;
use ccs_core::events::ClientEvent;
use ccs_core::ids::CorrelationId;
use ccs_core::send::{SendOutcome, SendRequest};
use ccs_settings::ClientSettings;
use futures::future::join_all;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::emitter::EventEmitter;
use crate::pending::PendingSend;
use crate::session::{Effects, Lifecycle, Session};
use crate::tracker::ConnectionState;
use crate::transport::{Transport, TransportEvent};

pub(crate) struct Inner {
    session: Mutex<Session>,
    transport: Arc<dyn Transport>,
    events: EventEmitter,
    closed: watch::Sender<bool>,
    settings: ClientSettings,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let session = self.session.get_mut();
        if session.lifecycle() != Lifecycle::Closed || !session.queue().is_empty() {
            debug!("client dropped, tearing down");
            let _ = session.shutdown(&*self.transport);
        }
    }
}

/// Flow-controlled CCS client.
///
/// ```ignore
/// let client = CcsClient::new(settings, transport);
/// let _driver = client.spawn_driver(transport_events);
/// let outcome = client.send(token, json!({"notification": {"title": "Hi"}})).await?;
/// client.end();
/// client.closed().await;
/// ```
#[derive(Clone)]
pub struct CcsClient {
    inner: Arc<Inner>,
}

impl CcsClient {
    /// Create a disconnected client over `transport`.
    ///
    /// Out-of-range settings are corrected with [`ClientSettings::validate`]
    /// first, so a zero ack timeout disables reaping.
    pub fn new(mut settings: ClientSettings, transport: Arc<dyn Transport>) -> Self {
        settings.validate();
        let (closed, _) = watch::channel(false);
        info!(
            concurrency = settings.concurrency,
            ack_timeout_ms = settings.ack_timeout_ms,
            endpoint = %settings.server.endpoint(),
            "client created"
        );
        Self {
            inner: Arc::new(Inner {
                session: Mutex::new(Session::new(settings.concurrency, settings.ack_timeout())),
                transport,
                events: EventEmitter::with_capacity(settings.event_capacity),
                closed,
                settings,
            }),
        }
    }

    /// Create a client with default settings.
    pub fn with_defaults(transport: Arc<dyn Transport>) -> Self {
        Self::new(ClientSettings::default(), transport)
    }

    pub(crate) fn downgrade(&self) -> Weak<Inner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn closed_receiver(&self) -> watch::Receiver<bool> {
        self.inner.closed.subscribe()
    }

    pub(crate) fn from_inner(inner: Arc<Inner>) -> Self {
        Self { inner }
    }

    /// Settings this client was built with.
    pub fn settings(&self) -> &ClientSettings {
        &self.inner.settings
    }

    /// Queue a notification for `recipient_token`.
    ///
    /// Never blocks. The message is written as soon as the client is
    /// connected, not paused, and has a free ack slot. After [`end`] the
    /// returned future resolves immediately with [`SendError::Ended`].
    ///
    /// [`end`]: Self::end
    pub fn send(&self, recipient_token: impl Into<String>, payload: Value) -> PendingSend {
        self.send_request(SendRequest::new(recipient_token, payload))
    }

    /// Queue a prepared request, keeping its correlation ID.
    pub fn send_request(&self, request: SendRequest) -> PendingSend {
        let (tx, rx) = oneshot::channel();
        let pending = PendingSend::new(request.correlation_id.clone(), rx);
        let effects = self
            .inner
            .session
            .lock()
            .enqueue(request, tx, &*self.inner.transport);
        self.apply(effects);
        pending
    }

    /// Send the same payload to several devices and wait for every result.
    ///
    /// Results are returned in token order.
    pub async fn send_many<I, S>(
        &self,
        recipient_tokens: I,
        payload: &Value,
    ) -> Vec<Result<SendOutcome, SendError>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pending: Vec<PendingSend> = recipient_tokens
            .into_iter()
            .map(|token| self.send(token, payload.clone()))
            .collect();
        join_all(pending).await
    }

    /// Stop accepting sends and close the transport once every queued
    /// message has settled. Closes immediately when idle. Idempotent.
    pub fn end(&self) {
        let effects = self.inner.session.lock().end(&*self.inner.transport);
        self.apply(effects);
    }

    /// Settle everything outstanding with [`SendError::Discarded`] and close
    /// the transport now.
    pub fn shutdown(&self) {
        let effects = self.inner.session.lock().shutdown(&*self.inner.transport);
        self.apply(effects);
    }

    /// Wait until the transport has been closed.
    pub async fn closed(&self) {
        let mut rx = self.inner.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Whether the transport has been closed.
    pub fn is_closed(&self) -> bool {
        *self.inner.closed.borrow()
    }

    /// Whether `end` has been called.
    pub fn is_ending(&self) -> bool {
        self.inner.session.lock().lifecycle() != Lifecycle::Open
    }

    /// Whether at least `concurrency` messages are unsettled.
    ///
    /// Advisory: `send` still accepts more, they just wait longer.
    pub fn is_saturated(&self) -> bool {
        self.inner.session.lock().queue().is_saturated()
    }

    /// Unsettled messages, queued and in flight.
    pub fn len(&self) -> usize {
        self.inner.session.lock().queue().len()
    }

    /// Whether every message has settled.
    pub fn is_empty(&self) -> bool {
        self.inner.session.lock().queue().is_empty()
    }

    /// Alias of [`is_empty`](Self::is_empty).
    pub fn idle(&self) -> bool {
        self.is_empty()
    }

    /// Occupied ack slots.
    pub fn in_flight(&self) -> usize {
        self.inner.session.lock().queue().in_flight_len()
    }

    /// Whether a draining notice paused dispatch.
    pub fn is_paused(&self) -> bool {
        self.inner.session.lock().is_paused()
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.inner.session.lock().connection_state()
    }

    /// Whether an unsettled message carries this correlation ID.
    pub fn is_outstanding(&self, message_id: &CorrelationId) -> bool {
        self.inner.session.lock().queue().contains(message_id)
    }

    /// Receive events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.events.subscribe()
    }

    /// Total events emitted.
    pub fn events_emitted(&self) -> u64 {
        self.inner.events.emit_count()
    }

    /// Apply something the transport observed.
    pub fn handle_transport_event(&self, event: TransportEvent) {
        let kind = event.kind();
        let effects = self
            .inner
            .session
            .lock()
            .on_transport_event(event, &*self.inner.transport);
        tracing::trace!(kind, events = effects.events.len(), "transport event applied");
        self.apply(effects);
    }

    /// Settle overdue in-flight messages with [`SendError::AckTimeout`].
    ///
    /// No-op unless an ack timeout is configured. Returns how many slots
    /// were reclaimed.
    pub fn reap_expired(&self) -> usize {
        let (reclaimed, effects) = self
            .inner
            .session
            .lock()
            .reap(Instant::now(), &*self.inner.transport);
        self.apply(effects);
        reclaimed
    }

    /// Run a background task feeding `events` into this client.
    ///
    /// See [`spawn_driver`](crate::spawn_driver).
    pub fn spawn_driver(&self, events: mpsc::UnboundedReceiver<TransportEvent>) -> JoinHandle<()> {
        crate::driver::spawn_driver(self, events)
    }

    fn apply(&self, effects: Effects) {
        for event in effects.events {
            let _ = self.inner.events.emit(event);
        }
        if effects.closed {
            info!("closed");
            let _ = self.inner.closed.send_replace(true);
        }
    }
}

impl std::fmt::Debug for CcsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.inner.session.lock();
        f.debug_struct("CcsClient")
            .field("state", &session.connection_state())
            .field("paused", &session.is_paused())
            .field("lifecycle", &session.lifecycle())
            .field("queued", &session.queue().len())
            .field("in_flight", &session.queue().in_flight_len())
            .finish()
    }
}
