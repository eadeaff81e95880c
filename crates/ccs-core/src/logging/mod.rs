//! Structured logging with `tracing`.
//!
//! The client crates log through `tracing` macros with structured fields
//! (`message_id`, `token_prefix`, `in_flight`, …). This module provides:
//!
//! - [`init_subscriber`] for installing a stderr subscriber in binaries
//! - [`capture_logs`] for asserting on emitted events in tests

pub mod test_utils;

pub use test_utils::{CapturedEvent, CapturedLogs, capture_logs};

/// Initialize the global tracing subscriber with stderr output.
///
/// `RUST_LOG` takes precedence over `level` when set. Subsequent calls are
/// no-ops.
pub fn init_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // try_init fails if a global subscriber is already set
    let _ = subscriber.try_init();
}
