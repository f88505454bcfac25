//! Inbound REST gateway.
//!
//! # Data Flow
//! ```text
//! HTTP client
//!     → axum Router (TraceLayer, TimeoutLayer)
//!     → handlers.rs → SessionManager outward calls (bounded by request timeout)
//!     → hub reply → HTTP response
//!
//! Health collaborators:
//!     GET /alive → HealthHandle
//!     GET /health → process liveness
//! ```
//!
//! # Design Decisions
//! - Stateless: handlers share only `Arc<SessionManager>`
//! - Bodies are parsed by hand so every malformed body is a 422
//! - Stops accepting on the process-wide shutdown broadcast

pub mod handlers;
pub mod server;

pub use handlers::{GatewayState, GenericRequest};
pub use server::{effective_request_timeout, GatewayServer};
