//! # ccs-core
//!
//! Foundation types for the CCS push-notification client.
//!
//! This crate provides the shared vocabulary the client crates depend on:
//!
//! - **IDs**: [`ids::CorrelationId`], the `message_id` echoed back by the server
//! - **Requests**: [`send::SendRequest`] and the settled [`send::SendOutcome`]
//! - **Frames**: [`frames::InboundFrame`] tagged union over inbound message types
//! - **Outbound**: [`outbound::OutboundStanza`] JSON bodies handed to the transport
//! - **Events**: [`events::ClientEvent`] for unsolicited notifications
//! - **Errors**: [`errors::SendError`], [`errors::TransportError`], [`errors::FrameError`]
//! - **Logging**: [`logging::init_subscriber`] and capture utilities for tests
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by `ccs-settings` and `ccs-client`.

#![deny(unsafe_code)]

pub mod errors;
pub mod events;
pub mod frames;
pub mod ids;
pub mod logging;
pub mod outbound;
pub mod send;
pub mod text;
