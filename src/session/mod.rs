//! Hub session subsystem.
//!
//! # Data Flow
//! ```text
//! ShutdownCoordinator spawns SessionManager::run
//!     → HubConnector::open_stream (bounded by connect timeout)
//!     → recv → Dispatcher::dispatch → send   (one message at a time)
//!     → close_send → sleep poll frequency → reopen
//!
//! Gateway (concurrently):
//!     → SessionManager::send_generic / post_event / put_event / delete_event
//!
//! Health collaborators:
//!     → HealthHandle::is_connected (read-only)
//! ```
//!
//! # Design Decisions
//! - All session state lives in one struct; collaborators get read-only
//!   handles or signal channels, never fields
//! - Dispatch is sequential per stream; responses keep request order
//! - Every event goes through `SessionObserver`, so control flow never
//!   depends on logging
//! - Sleeps race the stop token; shutdown is never delayed by a backoff

use std::time::Duration;

use thiserror::Error;

use crate::transport::TransportError;

pub mod manager;
pub mod observer;
pub mod settings;
pub mod state;

pub use manager::SessionManager;
pub use observer::{SessionObserver, StreamEnd, TracingObserver};
pub use settings::HubSettings;
pub use state::{ConnectionHealth, HealthHandle, SessionState};

/// Errors returned by the outward call methods.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The stop flag is set; no work was started.
    #[error("session is shutting down")]
    ShuttingDown,

    #[error("hub call timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
