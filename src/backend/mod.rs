//! Backend REST subsystem.
//!
//! # Data Flow
//! ```text
//! Handler (dispatch layer)
//!     → caller.rs (URL from root address + endpoint + segments)
//!     → one HTTP call with a fixed timeout
//!     → BackendResponse { status, body } passed through verbatim
//! ```
//!
//! # Design Decisions
//! - Single shared reqwest client (connection pooling)
//! - No retries here; retry policy belongs to whoever re-sends the request
//! - Non-2xx statuses are not errors; they are relayed to the hub

pub mod caller;

pub use caller::{BackendCaller, BackendError, BackendResponse};
