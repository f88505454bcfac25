//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Resolve hub settings → Build connector, backend, dispatcher
//!     → SessionManager
//!
//! Run (shutdown.rs):
//!     ShutdownCoordinator::spawn → track loop in InFlightTracker → run loop
//!
//! Shutdown (shutdown.rs):
//!     Shutdown::trigger → coordinator → SessionManager::drain
//!     → stop flag, close connection, wait in-flight == 0
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Ordered shutdown: stop opening, close connection, drain, exit
//! - The loop is registered as in-flight before it is spawned, so a drain
//!   that races startup still waits for it

pub mod in_flight;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use in_flight::{InFlightGuard, InFlightTracker, WorkId};
pub use shutdown::{Shutdown, ShutdownCoordinator};
