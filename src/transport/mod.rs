//! Hub transport subsystem.
//!
//! # Data Flow
//! ```text
//! SessionManager
//!     → HubConnector::open_stream (one stream per poll cycle)
//!     → HubStream::recv / send / close_send
//!
//! Outward calls (gateway):
//!     → HubConnector::call(UnaryCall) → Message
//!
//! Shutdown:
//!     → HubConnector::close (unblocks pending recv, refuses new streams)
//! ```
//!
//! # Implementations
//! - websocket.rs: JSON frames over tokio-tungstenite, optional TLS (tls.rs)
//! - memory.rs: in-process hub for tests and embedding
//!
//! # Design Decisions
//! - The connector is the long-lived "connection"; streams are cheap and
//!   reopened every cycle
//! - End-of-stream is `Ok(None)`, never an error

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::protocol::{Event, Message};

pub mod memory;
pub mod tls;
pub mod websocket;

pub use memory::{MemoryConnector, MemoryHub};
pub use websocket::WsConnector;

/// Errors raised by the hub transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("receive failed: {0}")]
    Receive(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("malformed frame: {0}")]
    Frame(String),

    /// The connector was closed (shutdown).
    #[error("connection closed")]
    Closed,

    /// The hub ended a unary call without replying.
    #[error("hub closed the call without a reply")]
    NoReply,

    #[error("invalid transport credentials: {0}")]
    Credentials(String),
}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        TransportError::Frame(e.to_string())
    }
}

/// A request/response call made against the hub outside the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum UnaryCall {
    Generic(Message),
    PublishEvent(Event),
    UpdateEvent(Event),
    DeleteEvent(String),
}

impl UnaryCall {
    /// Hub method name, used as the call endpoint.
    pub fn method(&self) -> &'static str {
        match self {
            UnaryCall::Generic(_) => "generic",
            UnaryCall::PublishEvent(_) => "events/publish",
            UnaryCall::UpdateEvent(_) => "events/update",
            UnaryCall::DeleteEvent(_) => "events/delete",
        }
    }

    /// JSON payload of the single request frame.
    pub fn payload(&self) -> Result<String, TransportError> {
        let json = match self {
            UnaryCall::Generic(message) => serde_json::to_string(message)?,
            UnaryCall::PublishEvent(event) | UnaryCall::UpdateEvent(event) => {
                serde_json::to_string(event)?
            }
            UnaryCall::DeleteEvent(id) => serde_json::json!({ "value": id }).to_string(),
        };
        Ok(json)
    }
}

/// One bidirectional stream instance.
#[async_trait]
pub trait HubStream: Send {
    /// Next inbound message; `Ok(None)` once the hub closed its send side.
    async fn recv(&mut self) -> Result<Option<Message>, TransportError>;

    async fn send(&mut self, message: &Message) -> Result<(), TransportError>;

    /// Tell the hub this side has nothing more to send.
    async fn close_send(&mut self) -> Result<(), TransportError>;
}

/// The shared connection to the hub.
#[async_trait]
pub trait HubConnector: Send + Sync {
    async fn open_stream(&self) -> Result<Box<dyn HubStream>, TransportError>;

    async fn call(&self, call: UnaryCall) -> Result<Message, TransportError>;

    /// Tear the connection down. Idempotent.
    async fn close(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_payload_wraps_id() {
        let call = UnaryCall::DeleteEvent("e42".into());
        assert_eq!(call.method(), "events/delete");
        assert_eq!(call.payload().unwrap(), r#"{"value":"e42"}"#);
    }

    #[test]
    fn generic_payload_is_a_message_frame() {
        let call = UnaryCall::Generic(Message::request("m1", "ping", ""));
        let parsed: Message = serde_json::from_str(&call.payload().unwrap()).unwrap();
        assert_eq!(parsed.msg_id, "m1");
        assert_eq!(parsed.path, "ping");
    }
}
