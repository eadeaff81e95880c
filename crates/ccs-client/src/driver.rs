//! Background task connecting a transport's event stream to a client.
//!
//! The driver holds only a weak reference: dropping every [`CcsClient`]
//! handle tears the client down and stops the task at its next wakeup.
//! With an ack timeout configured it also sweeps for overdue slots every
//! `reap_interval_ms`.

use std::future::pending;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::client::CcsClient;
use crate::transport::TransportEvent;

/// Spawn a task that applies every event from `events` to `client`.
///
/// The task ends when the channel closes, when the client is dropped, or
/// once the client has closed its transport.
///
/// Events are applied one at a time in arrival order.
pub fn spawn_driver(
    client: &CcsClient,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
) -> JoinHandle<()> {
    let weak = client.downgrade();
    let mut closed = client.closed_receiver();
    let mut reaper = client.settings().ack_timeout().map(|_| {
        let mut ticker = interval(client.settings().reap_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    tokio::spawn(async move {
        info!(reaping = reaper.is_some(), "driver started");
        loop {
            tokio::select! {
                () = wait_closed(&mut closed) => {
                    debug!("client closed");
                    break;
                }
                event = events.recv() => {
                    let Some(event) = event else {
                        debug!("transport event stream closed");
                        break;
                    };
                    let Some(inner) = weak.upgrade() else {
                        break;
                    };
                    CcsClient::from_inner(inner).handle_transport_event(event);
                }
                () = tick(reaper.as_mut()) => {
                    let Some(inner) = weak.upgrade() else {
                        break;
                    };
                    let _ = CcsClient::from_inner(inner).reap_expired();
                }
            }
        }
        info!("driver stopped");
    })
}

async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    let _ = closed.wait_for(|closed| *closed).await;
}

async fn tick(reaper: Option<&mut Interval>) {
    match reaper {
        Some(ticker) => {
            let _ = ticker.tick().await;
        }
        None => pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testutil::MockTransport;
    use assert_matches::assert_matches;
    use ccs_core::errors::SendError;
    use ccs_core::events::ClientEvent;
    use ccs_core::send::SendOutcome;
    use ccs_settings::ClientSettings;
    use serde_json::json;

    #[tokio::test]
    async fn applies_events_until_client_closes() {
        let (transport, rx) = MockTransport::new();
        transport.auto_ack();
        let client = CcsClient::new(ClientSettings::default(), transport.clone());
        let mut events = client.subscribe();
        let driver = client.spawn_driver(rx);

        transport.connect();
        assert_eq!(events.recv().await.unwrap(), ClientEvent::Connected);
        let outcome = client.send("tok", json!({})).await;
        assert_matches!(outcome, Ok(SendOutcome::Acked { .. }));

        client.end();
        client.closed().await;
        driver.await.unwrap();
        assert_eq!(transport.close_count(), 1);
    }

    #[tokio::test]
    async fn stops_when_client_dropped() {
        let (transport, rx) = MockTransport::new();
        let client = CcsClient::new(ClientSettings::default(), transport.clone());
        let driver = client.spawn_driver(rx);
        drop(client);
        transport.connect();
        driver.await.unwrap();
        assert_eq!(transport.close_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reaps_overdue_slots() {
        let (transport, rx) = MockTransport::new();
        let settings = ClientSettings {
            concurrency: 1,
            ack_timeout_ms: Some(500),
            reap_interval_ms: 100,
            ..ClientSettings::default()
        };
        let client = CcsClient::new(settings, transport.clone());
        let _driver = client.spawn_driver(rx);
        client.handle_transport_event(TransportEvent::Connected);

        let first = client.send("a", json!({}));
        let second = client.send("b", json!({}));
        assert_eq!(client.in_flight(), 1);

        let result = first.await;
        assert_eq!(result, Err(SendError::AckTimeout(Duration::from_millis(500))));
        assert_eq!(transport.downstream_writes().len(), 2);
        assert_eq!(client.in_flight(), 1);
        drop(second);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_reap_interval_falls_back_to_default() {
        let (transport, rx) = MockTransport::new();
        let settings = ClientSettings {
            ack_timeout_ms: Some(500),
            reap_interval_ms: 0,
            ..ClientSettings::default()
        };
        let client = CcsClient::new(settings, transport.clone());
        let driver = client.spawn_driver(rx);
        client.handle_transport_event(TransportEvent::Connected);

        let result = client.send("a", json!({})).await;
        assert_eq!(result, Err(SendError::AckTimeout(Duration::from_millis(500))));

        client.end();
        client.closed().await;
        driver.await.unwrap();
    }
}
