//! Connection state tracking.

use std::fmt;

/// Whether the transport currently has a usable session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session. The initial state.
    #[default]
    Disconnected,
    /// Session established.
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
        })
    }
}

/// Tracks the connection state and the draining pause.
///
/// Dispatch is allowed only while connected and not paused. The pause set
/// by a `CONNECTION_DRAINING` notice applies to the session that sent it,
/// so the next `Connected` after a `Disconnected` clears it.
#[derive(Debug, Default)]
pub struct ConnectionTracker {
    state: ConnectionState,
    paused: bool,
}

impl ConnectionTracker {
    /// Start disconnected and unpaused.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether a draining notice has paused dispatch.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether new downstream messages may be written.
    pub fn can_dispatch(&self) -> bool {
        self.state == ConnectionState::Connected && !self.paused
    }

    /// Record an established session.
    ///
    /// A pause is cleared only when coming from `Disconnected`; a repeated
    /// `Connected` for the same session keeps it. Returns `true` if a pause
    /// was lifted.
    pub fn on_connected(&mut self) -> bool {
        let previous = std::mem::replace(&mut self.state, ConnectionState::Connected);
        previous == ConnectionState::Disconnected && std::mem::take(&mut self.paused)
    }

    /// Record a lost session.
    ///
    /// Returns `true` if the state changed.
    pub fn on_disconnected(&mut self) -> bool {
        let was_connected = self.state == ConnectionState::Connected;
        self.state = ConnectionState::Disconnected;
        was_connected
    }

    /// Stop dispatching until the next session.
    ///
    /// Returns `true` if this call set the pause.
    pub fn pause(&mut self) -> bool {
        !std::mem::replace(&mut self.paused, true)
    }
}
