//! Metric names recorded by the client.
//!
//! Recorded through the [`metrics`] facade; installing an exporter is the
//! embedding application's job. Without a recorder every call is a no-op.

/// Sends accepted into the queue (counter).
pub const SENDS_TOTAL: &str = "ccs_sends_total";
/// Sends rejected at `send()` (counter, labels: reason).
pub const SENDS_REJECTED_TOTAL: &str = "ccs_sends_rejected_total";
/// Sends settled (counter, labels: result).
pub const SENDS_SETTLED_TOTAL: &str = "ccs_sends_settled_total";
/// Slots reclaimed after the ack timeout (counter).
pub const ACK_TIMEOUTS_TOTAL: &str = "ccs_ack_timeouts_total";
/// Downstream stanzas written to the transport (counter).
pub const DISPATCHES_TOTAL: &str = "ccs_dispatches_total";
/// In-flight items returned to the queue after a connection loss (counter).
pub const REQUEUED_TOTAL: &str = "ccs_requeued_total";
/// Inbound frames (counter, labels: kind).
pub const FRAMES_TOTAL: &str = "ccs_frames_total";
/// Inbound frames dropped without effect (counter, labels: reason).
pub const FRAMES_DISCARDED_TOTAL: &str = "ccs_frames_discarded_total";
/// Connection draining notices (counter).
pub const DRAINING_TOTAL: &str = "ccs_connection_draining_total";
/// Transport errors (counter, labels: kind).
pub const TRANSPORT_ERRORS_TOTAL: &str = "ccs_transport_errors_total";
/// Unsettled items in the queue (gauge).
pub const QUEUE_DEPTH: &str = "ccs_queue_depth";
/// Occupied ack slots (gauge).
pub const IN_FLIGHT: &str = "ccs_in_flight";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_prefixed_and_unique() {
        let names = [
            SENDS_TOTAL,
            SENDS_REJECTED_TOTAL,
            SENDS_SETTLED_TOTAL,
            ACK_TIMEOUTS_TOTAL,
            DISPATCHES_TOTAL,
            REQUEUED_TOTAL,
            FRAMES_TOTAL,
            FRAMES_DISCARDED_TOTAL,
            DRAINING_TOTAL,
            TRANSPORT_ERRORS_TOTAL,
            QUEUE_DEPTH,
            IN_FLIGHT,
        ];
        let unique: std::collections::HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
        assert!(names.iter().all(|n| n.starts_with("ccs_")));
    }
}
