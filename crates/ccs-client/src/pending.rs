//! Future returned by `send`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use ccs_core::errors::SendError;
use ccs_core::ids::CorrelationId;
use ccs_core::send::SendOutcome;
use tokio::sync::oneshot;

/// Resolves once the server acks or nacks the message, or the client gives
/// up on it.
///
/// Dropping a `PendingSend` does not cancel the send; the message is still
/// delivered and its slot still freed when the server answers.
#[derive(Debug)]
pub struct PendingSend {
    message_id: CorrelationId,
    rx: oneshot::Receiver<Result<SendOutcome, SendError>>,
}

impl PendingSend {
    pub(crate) fn new(
        message_id: CorrelationId,
        rx: oneshot::Receiver<Result<SendOutcome, SendError>>,
    ) -> Self {
        Self { message_id, rx }
    }

    /// Correlation ID written as `message_id`.
    pub fn message_id(&self) -> &CorrelationId {
        &self.message_id
    }

    /// The result if the send has already settled.
    pub fn try_result(&mut self) -> Option<Result<SendOutcome, SendError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(SendError::Discarded)),
        }
    }
}

impl Future for PendingSend {
    type Output = Result<SendOutcome, SendError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(SendError::Discarded)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn resolves_with_sent_result() {
        let (tx, rx) = oneshot::channel();
        let pending = PendingSend::new("m-1".into(), rx);
        assert_eq!(pending.message_id().as_str(), "m-1");
        tx.send(Ok(SendOutcome::Acked {
            message_id: "m-1".into(),
            canonical_token: None,
        }))
        .unwrap();
        assert_matches!(pending.await, Ok(SendOutcome::Acked { .. }));
    }

    #[tokio::test]
    async fn dropped_sender_is_discarded() {
        let (tx, rx) = oneshot::channel();
        let pending = PendingSend::new("m-1".into(), rx);
        drop(tx);
        assert_eq!(pending.await, Err(SendError::Discarded));
    }

    #[test]
    fn try_result_before_and_after() {
        let (tx, rx) = oneshot::channel();
        let mut pending = PendingSend::new("m-1".into(), rx);
        assert!(pending.try_result().is_none());
        tx.send(Err(SendError::Ended)).unwrap();
        assert_eq!(pending.try_result(), Some(Err(SendError::Ended)));
    }
}
