//! # ccs-client
//!
//! Flow-controlled client core for a CCS (XMPP push) connection.
//!
//! The server allows a bounded number of unacknowledged downstream messages
//! per connection. [`CcsClient`] accepts sends at any time, holds them in a
//! FIFO while disconnected, paused, or out of ack slots, and settles each
//! [`PendingSend`] when the matching ack or nack arrives.
//!
//! - [`queue`]: FIFO plus the bounded in-flight table
//! - [`tracker`]: connection state and the draining pause
//! - [`dispatcher`]: inbound frame to action routing
//! - [`session`]: the state machine composing the three
//! - [`client`]: the public façade and event broadcast
//! - [`driver`]: background task feeding transport events in
//! - [`transport`]: the seam a real XMPP connection implements
//!
//! ## Crate Position
//!
//! Depends on `ccs-core` and `ccs-settings`.

#![deny(unsafe_code)]

pub mod client;
pub mod dispatcher;
pub mod driver;
pub mod emitter;
pub mod metrics;
pub mod pending;
pub mod queue;
pub mod session;
pub mod testutil;
pub mod tracker;
pub mod transport;

pub use client::CcsClient;
pub use driver::spawn_driver;
pub use pending::PendingSend;
pub use tracker::ConnectionState;
pub use transport::{Transport, TransportEvent};

pub use ccs_core::errors::{SendError, TransportError};
pub use ccs_core::events::ClientEvent;
pub use ccs_core::send::{SendOutcome, SendRequest};
pub use ccs_settings::ClientSettings;
