//! In-memory transport for tests and local experiments.
//!
//! [`MockTransport`] records every stanza written to it and feeds
//! [`TransportEvent`]s into an unbounded channel, the same shape a real
//! transport hands to [`spawn_driver`](crate::spawn_driver). With an auto
//! reply configured it answers each downstream write with a frame carrying
//! that write's `message_id`, like a server would.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use ccs_core::errors::TransportError;
use ccs_core::outbound::{OutboundKind, OutboundStanza};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::client::CcsClient;
use crate::transport::{Transport, TransportEvent};

/// Recording transport backed by a channel of events.
pub struct MockTransport {
    writes: Mutex<Vec<OutboundStanza>>,
    auto_reply: Mutex<Option<Value>>,
    fail_writes: AtomicBool,
    close_count: AtomicUsize,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl MockTransport {
    /// Create a transport and the receiver for its events.
    pub fn new() -> (std::sync::Arc<Self>, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let transport = Self {
            writes: Mutex::new(Vec::new()),
            auto_reply: Mutex::new(None),
            fail_writes: AtomicBool::new(false),
            close_count: AtomicUsize::new(0),
            events,
        };
        (std::sync::Arc::new(transport), rx)
    }

    /// Answer every downstream write with `template` plus the write's
    /// `message_id`. `None` turns replies off.
    pub fn set_auto_reply(&self, template: Option<Value>) {
        *self.auto_reply.lock() = template;
    }

    /// Answer every downstream write with an ack.
    pub fn auto_ack(&self) {
        self.set_auto_reply(Some(serde_json::json!({"message_type": "ack"})));
    }

    /// Make subsequent writes fail with [`TransportError::WriteFailed`].
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Push an event as if the transport observed it.
    pub fn push_event(&self, event: TransportEvent) {
        let _ = self.events.send(event);
    }

    /// Signal an established session.
    pub fn connect(&self) {
        self.push_event(TransportEvent::Connected);
    }

    /// Signal a lost session.
    pub fn disconnect(&self) {
        self.push_event(TransportEvent::Disconnected);
    }

    /// Signal a transport error.
    pub fn raise(&self, error: TransportError) {
        self.push_event(TransportEvent::Error(error));
    }

    /// Deliver an inbound stanza body.
    pub fn deliver(&self, body: &Value) {
        self.push_event(TransportEvent::Stanza(body.to_string()));
    }

    /// Every stanza written so far.
    pub fn writes(&self) -> Vec<OutboundStanza> {
        self.writes.lock().clone()
    }

    /// Downstream stanzas written so far.
    pub fn downstream_writes(&self) -> Vec<OutboundStanza> {
        self.writes_of(OutboundKind::Downstream)
    }

    /// Acks written so far.
    pub fn ack_writes(&self) -> Vec<OutboundStanza> {
        self.writes_of(OutboundKind::Ack)
    }

    /// `message_id`s of downstream writes, in write order.
    pub fn downstream_ids(&self) -> Vec<String> {
        self.downstream_writes()
            .iter()
            .filter_map(|s| s.message_id().map(str::to_owned))
            .collect()
    }

    /// Forget recorded writes.
    pub fn clear_writes(&self) {
        self.writes.lock().clear();
    }

    /// How many times `close` was called.
    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }

    fn writes_of(&self, kind: OutboundKind) -> Vec<OutboundStanza> {
        self.writes
            .lock()
            .iter()
            .filter(|s| s.kind == kind)
            .cloned()
            .collect()
    }
}

impl Transport for MockTransport {
    fn write(&self, stanza: &OutboundStanza) -> Result<(), TransportError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TransportError::WriteFailed {
                reason: "mock write failure".into(),
            });
        }
        self.writes.lock().push(stanza.clone());

        if stanza.kind == OutboundKind::Downstream {
            let template = self.auto_reply.lock().clone();
            if let (Some(Value::Object(mut reply)), Some(id)) = (template, stanza.message_id()) {
                let _ = reply.insert("message_id".to_owned(), Value::from(id));
                self.deliver(&Value::Object(reply));
            }
        }
        Ok(())
    }

    fn close(&self) {
        let _ = self.close_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Apply every event already queued on `rx`, including replies those events
/// trigger. Returns how many events were applied.
pub fn pump_events(client: &CcsClient, rx: &mut mpsc::UnboundedReceiver<TransportEvent>) -> usize {
    let mut applied = 0;
    while let Ok(event) = rx.try_recv() {
        client.handle_transport_event(event);
        applied += 1;
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccs_core::send::SendRequest;
    use serde_json::json;

    #[test]
    fn records_writes_by_kind() {
        let (t, _rx) = MockTransport::new();
        let req = SendRequest::with_id("tok", json!({}), "m-1".into());
        t.write(&OutboundStanza::downstream(&req)).unwrap();
        t.write(&OutboundStanza::ack("dev", "u-1")).unwrap();
        assert_eq!(t.writes().len(), 2);
        assert_eq!(t.downstream_ids(), vec!["m-1"]);
        assert_eq!(t.ack_writes().len(), 1);
        t.clear_writes();
        assert!(t.writes().is_empty());
    }

    #[test]
    fn auto_reply_echoes_message_id() {
        let (t, mut rx) = MockTransport::new();
        t.auto_ack();
        let req = SendRequest::with_id("tok", json!({}), "m-9".into());
        t.write(&OutboundStanza::downstream(&req)).unwrap();
        let TransportEvent::Stanza(body) = rx.try_recv().unwrap() else {
            panic!("expected stanza");
        };
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["message_type"], "ack");
        assert_eq!(value["message_id"], "m-9");
    }

    #[test]
    fn acks_do_not_trigger_replies() {
        let (t, mut rx) = MockTransport::new();
        t.auto_ack();
        t.write(&OutboundStanza::ack("dev", "u-1")).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn failing_writes_are_not_recorded() {
        let (t, _rx) = MockTransport::new();
        t.fail_writes(true);
        let req = SendRequest::with_id("tok", json!({}), "m-1".into());
        assert!(t.write(&OutboundStanza::downstream(&req)).is_err());
        assert!(t.writes().is_empty());
    }
}
