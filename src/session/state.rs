//! Session state machine and connection health flag.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No stream is open. Initial state, and the state between streams.
    #[default]
    Disconnected,
    /// A stream open is in progress.
    Connecting,
    /// A stream is open and being served.
    Streaming,
    /// Stop was requested; in-flight work is finishing.
    Draining,
    /// Connection released and all in-flight work done. Terminal.
    Closed,
}

impl SessionState {
    /// Whether the session may move from `self` to `next`.
    ///
    /// Any running state may enter `Draining`; once draining, only `Closed`
    /// may follow, and nothing follows `Closed`.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;

        match (self, next) {
            (Closed, _) => false,
            (Draining, Closed) => true,
            (Draining, _) => false,
            (_, Draining) => true,
            (Disconnected, Connecting) => true,
            (Connecting, Streaming) | (Connecting, Disconnected) => true,
            (Streaming, Disconnected) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == SessionState::Closed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Streaming => "streaming",
            SessionState::Draining => "draining",
            SessionState::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Writer side of the connection health flag. Owned by the session.
#[derive(Debug, Default)]
pub struct ConnectionHealth {
    flag: Arc<AtomicBool>,
}

impl ConnectionHealth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag, returning the previous value.
    pub fn mark(&self, healthy: bool) -> bool {
        self.flag.swap(healthy, Ordering::SeqCst)
    }

    pub fn is_connected(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Read-only handle for health-check collaborators.
    pub fn handle(&self) -> HealthHandle {
        HealthHandle {
            flag: Arc::clone(&self.flag),
        }
    }
}

/// Read-only view of the connection health flag.
#[derive(Debug, Clone)]
pub struct HealthHandle {
    flag: Arc<AtomicBool>,
}

impl HealthHandle {
    pub fn is_connected(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
