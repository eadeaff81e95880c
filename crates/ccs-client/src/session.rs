//! Client state machine.
//!
//! [`Session`] owns the queue, the connection tracker and the end/close
//! lifecycle. Every operation runs to completion under the client's lock
//! and reports what the caller must do afterwards (events to broadcast,
//! whether the client just closed) as [`Effects`].
//!
//! Dispatch runs after every state change that could free a slot or enable
//! sending: enqueue, connect, settle, and timeout reaping.

use std::time::Duration;

use ccs_core::errors::{SendError, TransportError};
use ccs_core::events::ClientEvent;
use ccs_core::outbound::OutboundStanza;
use ccs_core::send::SendRequest;
use ccs_core::text::token_prefix;
use metrics::{counter, gauge};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::dispatcher::{self, FrameAction};
use crate::metrics::{
    ACK_TIMEOUTS_TOTAL, DISPATCHES_TOTAL, DRAINING_TOTAL, FRAMES_DISCARDED_TOTAL, FRAMES_TOTAL,
    IN_FLIGHT, QUEUE_DEPTH, REQUEUED_TOTAL, SENDS_REJECTED_TOTAL, SENDS_SETTLED_TOTAL,
    SENDS_TOTAL, TRANSPORT_ERRORS_TOTAL,
};
use crate::queue::{QueueItem, Responder, SendQueue};
use crate::tracker::{ConnectionState, ConnectionTracker};
use crate::transport::{Transport, TransportEvent};

/// Where the client is in its shutdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// Accepting sends.
    Open,
    /// `end()` was called; draining what is queued.
    Ending,
    /// Transport closed.
    Closed,
}

/// Follow-up work produced by a session operation.
#[derive(Debug, Default)]
pub struct Effects {
    /// Events to broadcast, in order.
    pub events: Vec<ClientEvent>,
    /// The transport was closed by this operation.
    pub closed: bool,
}

/// Queue, connection state and lifecycle of one client.
#[derive(Debug)]
pub struct Session {
    tracker: ConnectionTracker,
    queue: SendQueue,
    lifecycle: Lifecycle,
    ack_timeout: Option<Duration>,
}

impl Session {
    /// Create an open, disconnected session.
    pub fn new(concurrency: usize, ack_timeout: Option<Duration>) -> Self {
        Self {
            tracker: ConnectionTracker::new(),
            queue: SendQueue::new(concurrency),
            lifecycle: Lifecycle::Open,
            ack_timeout,
        }
    }

    /// The send queue.
    pub fn queue(&self) -> &SendQueue {
        &self.queue
    }

    /// Connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.tracker.state()
    }

    /// Whether a draining notice paused dispatch.
    pub fn is_paused(&self) -> bool {
        self.tracker.is_paused()
    }

    /// Shutdown position.
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Accept a request and dispatch if possible.
    pub fn enqueue(
        &mut self,
        request: SendRequest,
        responder: Responder,
        transport: &dyn Transport,
    ) -> Effects {
        let mut effects = Effects::default();
        if self.lifecycle != Lifecycle::Open {
            debug!(message_id = %request.correlation_id, "send after end rejected");
            counter!(SENDS_REJECTED_TOTAL, "reason" => "ended").increment(1);
            let _ = responder.send(Err(SendError::Ended));
            return effects;
        }
        if let Err(item) = self.queue.push(QueueItem::new(request, responder)) {
            warn!(message_id = %item.id(), "duplicate message_id rejected");
            counter!(SENDS_REJECTED_TOTAL, "reason" => "duplicate_id").increment(1);
            let id = item.id().to_string();
            item.resolve(Err(SendError::DuplicateId(id)));
            return effects;
        }
        counter!(SENDS_TOTAL).increment(1);
        self.pump(transport, &mut effects);
        effects
    }

    /// Apply one transport event.
    pub fn on_transport_event(
        &mut self,
        event: TransportEvent,
        transport: &dyn Transport,
    ) -> Effects {
        let mut effects = Effects::default();
        match event {
            TransportEvent::Connected => {
                if self.tracker.on_connected() {
                    info!("new session, draining pause lifted");
                }
                info!(queued = self.queue.len(), "connected");
                effects.events.push(ClientEvent::Connected);
                self.pump(transport, &mut effects);
            }
            TransportEvent::Disconnected => self.connection_lost(None, &mut effects),
            TransportEvent::Error(error) => self.connection_lost(Some(error), &mut effects),
            TransportEvent::Stanza(body) => self.on_frame(&body, transport, &mut effects),
        }
        effects
    }

    /// Stop accepting sends; close once the queue drains.
    pub fn end(&mut self, transport: &dyn Transport) -> Effects {
        let mut effects = Effects::default();
        if self.lifecycle != Lifecycle::Open {
            return effects;
        }
        self.lifecycle = Lifecycle::Ending;
        info!(remaining = self.queue.len(), "ending");
        self.maybe_close(transport, &mut effects);
        effects
    }

    /// Drop every unsettled item and close immediately.
    pub fn shutdown(&mut self, transport: &dyn Transport) -> Effects {
        let mut effects = Effects::default();
        let discarded = self.queue.discard_all();
        if discarded > 0 {
            warn!(discarded, "shutdown discarded unsettled sends");
            counter!(SENDS_SETTLED_TOTAL, "result" => "discarded").increment(discarded as u64);
        }
        if self.lifecycle != Lifecycle::Closed {
            self.lifecycle = Lifecycle::Closed;
            transport.close();
            effects.closed = true;
        }
        self.record_depth();
        effects
    }

    /// Reclaim slots whose ack is overdue at `now`. Returns how many.
    pub fn reap(&mut self, now: Instant, transport: &dyn Transport) -> (usize, Effects) {
        let mut effects = Effects::default();
        let Some(timeout) = self.ack_timeout else {
            return (0, effects);
        };
        let reclaimed = self.queue.expire(now, timeout);
        if reclaimed > 0 {
            warn!(reclaimed, ?timeout, "ack timeout, slots reclaimed");
            counter!(ACK_TIMEOUTS_TOTAL).increment(reclaimed as u64);
            self.pump(transport, &mut effects);
            self.maybe_close(transport, &mut effects);
        }
        (reclaimed, effects)
    }

    fn on_frame(&mut self, body: &str, transport: &dyn Transport, effects: &mut Effects) {
        match dispatcher::route_text(body) {
            FrameAction::Settle {
                message_id,
                outcome,
            } => {
                let result = if outcome.is_acked() { "acked" } else { "nacked" };
                counter!(FRAMES_TOTAL, "kind" => if outcome.is_acked() { "ack" } else { "nack" })
                    .increment(1);
                if self.queue.settle(&message_id, Ok(outcome)) {
                    debug!(%message_id, result, "settled");
                    counter!(SENDS_SETTLED_TOTAL, "result" => result).increment(1);
                    self.pump(transport, effects);
                    self.maybe_close(transport, effects);
                } else {
                    debug!(%message_id, "no in-flight send for this id");
                    counter!(FRAMES_DISCARDED_TOTAL, "reason" => "unmatched").increment(1);
                }
            }
            FrameAction::Pause => {
                counter!(FRAMES_TOTAL, "kind" => "control").increment(1);
                if self.tracker.pause() {
                    info!(queued = self.queue.pending_len(), "connection draining, dispatch paused");
                    counter!(DRAINING_TOTAL).increment(1);
                }
            }
            FrameAction::Emit { event, ack } => {
                counter!(FRAMES_TOTAL, "kind" => event.event_type()).increment(1);
                if let Some(ack) = ack {
                    self.write_ack(&ack, transport);
                }
                effects.events.push(event);
            }
            FrameAction::Discard { reason } => {
                debug!(reason, "frame discarded");
                counter!(FRAMES_DISCARDED_TOTAL, "reason" => reason).increment(1);
            }
        }
    }

    fn write_ack(&self, ack: &OutboundStanza, transport: &dyn Transport) {
        if self.tracker.state() != ConnectionState::Connected {
            debug!(message_id = ack.message_id(), "not connected, ack dropped");
            return;
        }
        if let Err(error) = transport.write(ack) {
            warn!(%error, message_id = ack.message_id(), "failed to write ack");
        }
    }

    fn pump(&mut self, transport: &dyn Transport, effects: &mut Effects) {
        while self.tracker.can_dispatch() {
            let Some(item) = self.queue.next_ready() else {
                break;
            };
            let stanza = OutboundStanza::downstream(item.request());
            match transport.write(&stanza) {
                Ok(()) => {
                    debug!(
                        message_id = %item.id(),
                        token = token_prefix(&item.request().recipient_token),
                        "dispatched"
                    );
                    counter!(DISPATCHES_TOTAL).increment(1);
                    self.queue.mark_in_flight(item, Instant::now());
                }
                Err(error) => {
                    warn!(%error, message_id = %item.id(), "write failed, send requeued");
                    self.queue.restore(item);
                    self.connection_lost(Some(error), effects);
                    break;
                }
            }
        }
        self.record_depth();
    }

    fn connection_lost(&mut self, error: Option<TransportError>, effects: &mut Effects) {
        if let Some(error) = error {
            warn!(%error, kind = error.error_kind(), "transport error");
            counter!(TRANSPORT_ERRORS_TOTAL, "kind" => error.error_kind()).increment(1);
            effects.events.push(ClientEvent::Error(error));
        }
        if self.tracker.on_disconnected() {
            let requeued = self.queue.requeue_in_flight();
            info!(requeued, "disconnected");
            counter!(REQUEUED_TOTAL).increment(requeued as u64);
            effects.events.push(ClientEvent::Disconnected);
            self.record_depth();
        }
    }

    fn maybe_close(&mut self, transport: &dyn Transport, effects: &mut Effects) {
        if self.lifecycle == Lifecycle::Ending && self.queue.is_empty() {
            self.lifecycle = Lifecycle::Closed;
            info!("queue drained, closing transport");
            transport.close();
            effects.closed = true;
        }
    }

    fn record_depth(&self) {
        gauge!(QUEUE_DEPTH).set(self.queue.len() as f64);
        gauge!(IN_FLIGHT).set(self.queue.in_flight_len() as f64);
    }
}
