//! Flow-controlled send queue.
//!
//! Items wait in a FIFO until an ack slot is free, then move to the
//! in-flight table keyed by correlation ID until the server answers.
//! Settlement resolves the item's responder and drops the item.
//!
//! The queue does not know about connections; the session decides when to
//! take the next item and whether the write succeeded.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use ccs_core::errors::SendError;
use ccs_core::ids::CorrelationId;
use ccs_core::send::{SendOutcome, SendRequest};
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Settles one send.
pub type Responder = oneshot::Sender<Result<SendOutcome, SendError>>;

/// Lifecycle position of a queued item.
///
/// Settled items are removed from the queue, so there is no settled state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemState {
    /// Waiting for a slot and a connection.
    Pending,
    /// Written to the transport, waiting for an ack or nack.
    AwaitingAck,
}

/// A send request plus the channel that settles it.
#[derive(Debug)]
pub struct QueueItem {
    request: SendRequest,
    state: ItemState,
    responder: Responder,
}

impl QueueItem {
    /// Wrap a request in the pending state.
    pub fn new(request: SendRequest, responder: Responder) -> Self {
        Self {
            request,
            state: ItemState::Pending,
            responder,
        }
    }

    /// The request to write.
    pub fn request(&self) -> &SendRequest {
        &self.request
    }

    /// Correlation ID of the request.
    pub fn id(&self) -> &CorrelationId {
        &self.request.correlation_id
    }

    /// Current lifecycle position.
    pub fn state(&self) -> ItemState {
        self.state
    }

    /// Settle the item. The caller may have dropped its future already.
    pub fn resolve(self, result: Result<SendOutcome, SendError>) {
        let _ = self.responder.send(result);
    }
}

#[derive(Debug)]
struct InFlight {
    item: QueueItem,
    seq: u64,
    dispatched_at: Instant,
}

/// FIFO of pending items plus the bounded set of in-flight ones.
#[derive(Debug)]
pub struct SendQueue {
    concurrency: usize,
    pending: VecDeque<QueueItem>,
    in_flight: HashMap<CorrelationId, InFlight>,
    ids: HashSet<CorrelationId>,
    next_seq: u64,
}

impl SendQueue {
    /// Create a queue with `concurrency` ack slots (at least one).
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            pending: VecDeque::new(),
            in_flight: HashMap::new(),
            ids: HashSet::new(),
            next_seq: 0,
        }
    }

    /// Number of ack slots.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Unsettled items, pending and in flight.
    pub fn len(&self) -> usize {
        self.pending.len() + self.in_flight.len()
    }

    /// Whether every item has settled.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.in_flight.is_empty()
    }

    /// Items waiting for a slot or a connection.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Occupied ack slots.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether the queue holds at least as many items as there are slots.
    pub fn is_saturated(&self) -> bool {
        self.len() >= self.concurrency
    }

    /// Whether an item with this correlation ID is unsettled.
    pub fn contains(&self, id: &CorrelationId) -> bool {
        self.ids.contains(id)
    }

    /// Append an item.
    ///
    /// Hands the item back if its correlation ID is already unsettled.
    pub fn push(&mut self, item: QueueItem) -> Result<(), QueueItem> {
        if !self.ids.insert(item.id().clone()) {
            return Err(item);
        }
        self.pending.push_back(item);
        Ok(())
    }

    /// Take the oldest pending item if a slot is free.
    ///
    /// The item stays registered; hand it back with [`mark_in_flight`] or
    /// [`restore`].
    ///
    /// [`mark_in_flight`]: Self::mark_in_flight
    /// [`restore`]: Self::restore
    pub fn next_ready(&mut self) -> Option<QueueItem> {
        if self.in_flight.len() >= self.concurrency {
            return None;
        }
        self.pending.pop_front()
    }

    /// Record a written item as occupying a slot.
    pub fn mark_in_flight(&mut self, mut item: QueueItem, now: Instant) {
        item.state = ItemState::AwaitingAck;
        let seq = self.next_seq;
        self.next_seq += 1;
        let _ = self.in_flight.insert(
            item.id().clone(),
            InFlight {
                item,
                seq,
                dispatched_at: now,
            },
        );
    }

    /// Return an item that could not be written to the front of the FIFO.
    pub fn restore(&mut self, mut item: QueueItem) {
        item.state = ItemState::Pending;
        self.pending.push_front(item);
    }

    /// Settle the in-flight item with this ID and free its slot.
    ///
    /// Returns `false` if no item with this ID is in flight.
    pub fn settle(&mut self, id: &CorrelationId, result: Result<SendOutcome, SendError>) -> bool {
        let Some(entry) = self.in_flight.remove(id) else {
            return false;
        };
        let _ = self.ids.remove(id);
        entry.item.resolve(result);
        true
    }

    /// Move every in-flight item back to the front of the FIFO in dispatch
    /// order, freeing all slots. Returns the number of items moved.
    pub fn requeue_in_flight(&mut self) -> usize {
        let mut entries: Vec<InFlight> = self.in_flight.drain().map(|(_, e)| e).collect();
        entries.sort_by_key(|e| e.seq);
        let count = entries.len();
        for entry in entries.into_iter().rev() {
            self.restore(entry.item);
        }
        count
    }

    /// Settle every in-flight item dispatched at least `timeout` before
    /// `now` with [`SendError::AckTimeout`]. Returns the number reclaimed.
    pub fn expire(&mut self, now: Instant, timeout: Duration) -> usize {
        let expired: Vec<CorrelationId> = self
            .in_flight
            .iter()
            .filter(|(_, e)| now.saturating_duration_since(e.dispatched_at) >= timeout)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            let _ = self.settle(id, Err(SendError::AckTimeout(timeout)));
        }
        expired.len()
    }

    /// Settle everything with [`SendError::Discarded`]. Returns the number
    /// of items dropped.
    pub fn discard_all(&mut self) -> usize {
        let mut count = 0;
        for (_, entry) in self.in_flight.drain() {
            entry.item.resolve(Err(SendError::Discarded));
            count += 1;
        }
        for item in self.pending.drain(..) {
            item.resolve(Err(SendError::Discarded));
            count += 1;
        }
        self.ids.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    type Rx = oneshot::Receiver<Result<SendOutcome, SendError>>;

    fn item(id: &str) -> (QueueItem, Rx) {
        let (tx, rx) = oneshot::channel();
        let req = SendRequest::with_id("tok", json!({"n": id}), id.into());
        (QueueItem::new(req, tx), rx)
    }

    fn push(q: &mut SendQueue, id: &str) -> Rx {
        let (it, rx) = item(id);
        q.push(it).unwrap();
        rx
    }

    fn dispatch_all(q: &mut SendQueue) -> Vec<String> {
        let mut ids = Vec::new();
        while let Some(it) = q.next_ready() {
            ids.push(it.id().to_string());
            q.mark_in_flight(it, Instant::now());
        }
        ids
    }

    fn acked(id: &str) -> Result<SendOutcome, SendError> {
        Ok(SendOutcome::Acked {
            message_id: id.into(),
            canonical_token: None,
        })
    }

    #[test]
    fn new_queue_is_empty() {
        let q = SendQueue::new(3);
        assert!(q.is_empty());
        assert_eq!(q.len(), 0);
        assert!(!q.is_saturated());
        assert_eq!(q.concurrency(), 3);
    }

    #[test]
    fn zero_concurrency_is_clamped() {
        assert_eq!(SendQueue::new(0).concurrency(), 1);
    }

    #[test]
    fn dispatch_respects_slot_limit_and_order() {
        let mut q = SendQueue::new(2);
        let _rx: Vec<Rx> = ["a", "b", "c"].iter().map(|id| push(&mut q, id)).collect();

        assert_eq!(dispatch_all(&mut q), vec!["a", "b"]);
        assert_eq!(q.in_flight_len(), 2);
        assert_eq!(q.pending_len(), 1);
        assert_eq!(q.len(), 3);
        assert!(q.is_saturated());

        assert!(q.settle(&"a".into(), acked("a")));
        assert_eq!(dispatch_all(&mut q), vec!["c"]);
    }

    #[test]
    fn settle_resolves_responder() {
        let mut q = SendQueue::new(1);
        let mut rx = push(&mut q, "a");
        let _ = dispatch_all(&mut q);
        assert!(q.settle(&"a".into(), acked("a")));
        assert_matches!(rx.try_recv(), Ok(Ok(SendOutcome::Acked { .. })));
        assert!(q.is_empty());
        assert!(!q.contains(&"a".into()));
    }

    #[test]
    fn settle_unknown_or_pending_id_is_noop() {
        let mut q = SendQueue::new(1);
        let _rx = push(&mut q, "a");
        assert!(!q.settle(&"a".into(), acked("a")));
        assert!(!q.settle(&"zzz".into(), acked("zzz")));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut q = SendQueue::new(1);
        let _rx = push(&mut q, "a");
        let (dup, _rx2) = item("a");
        assert!(q.push(dup).is_err());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn restore_puts_item_at_front() {
        let mut q = SendQueue::new(5);
        let _a = push(&mut q, "a");
        let _b = push(&mut q, "b");
        let first = q.next_ready().unwrap();
        assert_eq!(first.id().as_str(), "a");
        q.restore(first);
        assert_eq!(dispatch_all(&mut q), vec!["a", "b"]);
    }

    #[test]
    fn requeue_preserves_dispatch_order() {
        let mut q = SendQueue::new(3);
        let _rx: Vec<Rx> = ["a", "b", "c", "d"].iter().map(|id| push(&mut q, id)).collect();
        let _ = dispatch_all(&mut q);
        assert_eq!(q.requeue_in_flight(), 3);
        assert_eq!(q.in_flight_len(), 0);
        assert_eq!(q.pending_len(), 4);
        assert_eq!(dispatch_all(&mut q), vec!["a", "b", "c"]);
    }

    #[test]
    fn requeued_items_are_pending() {
        let mut q = SendQueue::new(1);
        let _rx = push(&mut q, "a");
        let _ = dispatch_all(&mut q);
        let _ = q.requeue_in_flight();
        let it = q.next_ready().unwrap();
        assert_eq!(it.state(), ItemState::Pending);
    }

    #[test]
    fn expire_reclaims_old_slots() {
        let mut q = SendQueue::new(2);
        let mut old = push(&mut q, "old");
        let _new = push(&mut q, "new");
        let start = Instant::now();
        let it = q.next_ready().unwrap();
        q.mark_in_flight(it, start);
        let it = q.next_ready().unwrap();
        q.mark_in_flight(it, start + Duration::from_secs(20));

        let reclaimed = q.expire(start + Duration::from_secs(30), Duration::from_secs(30));
        assert_eq!(reclaimed, 1);
        assert_eq!(q.in_flight_len(), 1);
        assert_matches!(old.try_recv(), Ok(Err(SendError::AckTimeout(_))));
    }

    #[test]
    fn discard_all_settles_everything() {
        let mut q = SendQueue::new(1);
        let mut a = push(&mut q, "a");
        let mut b = push(&mut q, "b");
        let _ = dispatch_all(&mut q);
        assert_eq!(q.discard_all(), 2);
        assert!(q.is_empty());
        assert_matches!(a.try_recv(), Ok(Err(SendError::Discarded)));
        assert_matches!(b.try_recv(), Ok(Err(SendError::Discarded)));
        let _c = push(&mut q, "a");
    }

    #[test]
    fn resolve_after_receiver_dropped_is_silent() {
        let (it, rx) = item("a");
        drop(rx);
        it.resolve(acked("a"));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Clone, Debug)]
        enum Op {
            Push,
            Dispatch,
            Settle(usize),
            Requeue,
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                3 => Just(Op::Push),
                3 => Just(Op::Dispatch),
                2 => (0usize..16).prop_map(Op::Settle),
                1 => Just(Op::Requeue),
            ]
        }

        proptest! {
            #[test]
            fn slots_bounded_and_first_dispatch_in_fifo_order(
                concurrency in 1usize..6,
                ops in prop::collection::vec(op(), 1..80),
            ) {
                let mut q = SendQueue::new(concurrency);
                let mut next = 0usize;
                let mut receivers = Vec::new();
                let mut first_dispatch: Vec<usize> = Vec::new();
                let mut seen = HashSet::new();

                for op in ops {
                    match op {
                        Op::Push => {
                            receivers.push(push(&mut q, &next.to_string()));
                            next += 1;
                        }
                        Op::Dispatch => {
                            for id in dispatch_all(&mut q) {
                                let n: usize = id.parse().unwrap();
                                if seen.insert(n) {
                                    first_dispatch.push(n);
                                }
                            }
                        }
                        Op::Settle(i) => {
                            let id = CorrelationId::from(i.to_string());
                            let _ = q.settle(&id, acked(id.as_str()));
                        }
                        Op::Requeue => {
                            let _ = q.requeue_in_flight();
                        }
                    }
                    prop_assert!(q.in_flight_len() <= concurrency);
                    prop_assert_eq!(q.len(), q.pending_len() + q.in_flight_len());
                }

                let mut sorted = first_dispatch.clone();
                sorted.sort_unstable();
                prop_assert_eq!(first_dispatch, sorted);
            }
        }
    }
}
