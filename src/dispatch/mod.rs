//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound Message (path, body)
//!     → dispatcher.rs (registry lookup by path)
//!     → registry.rs (path → Handler)
//!     → handlers.rs (decode body, build URL, one backend call)
//!     → response Message (msgID forced to the request's)
//!
//! Unknown path:
//!     → fixed 400 "unknown path" response + DispatchError::UnknownPath
//! ```
//!
//! # Design Decisions
//! - Handlers never fail the stream; every error becomes a response
//! - Registry is built once at startup and shared immutably
//! - New paths are registered, not matched in a conditional chain

use thiserror::Error;

use crate::backend::BackendError;

pub mod dispatcher;
pub mod handlers;
pub mod registry;

pub use dispatcher::{DispatchOutcome, Dispatcher, UNKNOWN_PATH_BODY};
pub use registry::{handler_fn, Handler, HandlerRegistry};

/// Failure inside a single handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The request body did not match the handler's request shape.
    #[error("{0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl HandlerError {
    /// Status code reported to the hub for this failure.
    pub fn status(&self) -> i32 {
        match self {
            HandlerError::InvalidPayload(_) => 422,
            HandlerError::Backend(_) => 500,
        }
    }
}

/// Failure to dispatch one inbound message. Reported, never retried.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unknown path provided: '{0}'")]
    UnknownPath(String),

    #[error("handler for '{path}' failed: {source}")]
    Handler {
        path: String,
        #[source]
        source: HandlerError,
    },
}
