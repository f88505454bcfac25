//! Wire types exchanged with the hub.
//!
//! # Data Flow
//! ```text
//! Hub frame (JSON text)
//!     → message.rs (Message: msgID, path, headers, body, status)
//!     → dispatch layer
//!     → Message (response, same msgID)
//!     → Hub frame
//!
//! Gateway calls:
//!     event.rs (Event payloads for publish/update)
//!     → unary hub call → Message
//! ```
//!
//! # Design Decisions
//! - One envelope type for both directions
//! - `msgID` is an opaque token, echoed verbatim
//! - Bodies are raw bytes, base64 on the wire

pub mod event;
pub mod message;

pub use event::{Event, EventRequest};
pub use message::Message;
