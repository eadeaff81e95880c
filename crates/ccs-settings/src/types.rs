//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so partial
//! JSON files work: missing fields get their default value.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Default number of ack slots (the server's per-connection limit).
pub const DEFAULT_CONCURRENCY: usize = 100;
/// Default broadcast capacity for client events.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;
/// Default interval between ack-timeout sweeps.
pub const DEFAULT_REAP_INTERVAL_MS: u64 = 1000;
/// Production CCS endpoint.
pub const DEFAULT_HOST: &str = "fcm-xmpp.googleapis.com";
/// Production CCS port (pre-production uses 5236).
pub const DEFAULT_PORT: u16 = 5235;

/// Root settings for one client instance.
///
/// ```json
/// {
///   "concurrency": 100,
///   "ackTimeoutMs": 30000,
///   "server": { "host": "fcm-xmpp.googleapis.com", "port": 5235 },
///   "credentials": { "senderId": "1234", "serverKey": "AAAA…" }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    /// Maximum in-flight (unacknowledged) sends.
    pub concurrency: usize,
    /// Reclaim a slot when no ack/nack arrives within this many ms.
    /// Unset: a slot is held until its ack arrives.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ack_timeout_ms: Option<u64>,
    /// How often the driver sweeps for expired slots (only with a timeout).
    pub reap_interval_ms: u64,
    /// Capacity of the client event broadcast channel.
    pub event_capacity: usize,
    /// Remote endpoint, consumed by the transport.
    pub server: ServerSettings,
    /// Authentication, consumed by the transport.
    pub credentials: Credentials,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            ack_timeout_ms: None,
            reap_interval_ms: DEFAULT_REAP_INTERVAL_MS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            server: ServerSettings::default(),
            credentials: Credentials::default(),
        }
    }
}

impl ClientSettings {
    /// Settings with a custom concurrency and defaults elsewhere.
    pub fn with_concurrency(concurrency: usize) -> Self {
        Self {
            concurrency,
            ..Self::default()
        }
    }

    /// The ack timeout as a `Duration`, if configured.
    pub fn ack_timeout(&self) -> Option<Duration> {
        self.ack_timeout_ms.map(Duration::from_millis)
    }

    /// Interval between ack-timeout sweeps.
    pub fn reap_interval(&self) -> Duration {
        Duration::from_millis(self.reap_interval_ms)
    }

    /// Correct invalid values in place.
    ///
    /// Called automatically during loading. Out-of-range values are replaced
    /// with a warning rather than rejected.
    pub fn validate(&mut self) {
        if self.concurrency == 0 {
            tracing::warn!("concurrency must be at least 1, using 1");
            self.concurrency = 1;
        }
        if self.event_capacity == 0 {
            tracing::warn!(
                default = DEFAULT_EVENT_CAPACITY,
                "event capacity must be positive, using default"
            );
            self.event_capacity = DEFAULT_EVENT_CAPACITY;
        }
        if self.ack_timeout_ms == Some(0) {
            tracing::warn!("ackTimeoutMs of 0 disables the ack timeout");
            self.ack_timeout_ms = None;
        }
        if self.reap_interval_ms == 0 {
            self.reap_interval_ms = DEFAULT_REAP_INTERVAL_MS;
        }
    }

    /// Fail unless both credential fields are present.
    ///
    /// Transports call this before opening a connection.
    pub fn require_credentials(&self) -> Result<&Credentials> {
        if self.credentials.sender_id.is_empty() {
            return Err(SettingsError::InvalidValue("senderId is required".into()));
        }
        if self.credentials.server_key.is_empty() {
            return Err(SettingsError::InvalidValue("serverKey is required".into()));
        }
        Ok(&self.credentials)
    }
}

/// Remote endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Hostname.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerSettings {
    /// `host:port` string.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Sender credentials.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Credentials {
    /// Project sender ID (the username part of the JID).
    pub sender_id: String,
    /// Server key used as the SASL password.
    pub server_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("sender_id", &self.sender_id)
            .field(
                "server_key",
                &if self.server_key.is_empty() { "" } else { "[redacted]" },
            )
            .finish()
    }
}
