//! Hub protocol bridge library.
//!
//! Keeps a long-lived stream to the hub, dispatches every inbound request
//! to a backend REST handler and answers on the same stream. A small REST
//! gateway relays outward calls to the hub.

// Core subsystems
pub mod backend;
pub mod config;
pub mod dispatch;
pub mod protocol;
pub mod session;
pub mod transport;

// Outer surface
pub mod gateway;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::BridgeConfig;
pub use dispatch::Dispatcher;
pub use lifecycle::{Shutdown, ShutdownCoordinator};
pub use protocol::Message;
pub use session::SessionManager;
