//! Inbound message dispatch.

use std::sync::Arc;

use crate::dispatch::{DispatchError, HandlerRegistry};
use crate::protocol::Message;

/// Body of the response to an unregistered path.
pub const UNKNOWN_PATH_BODY: &str = "unknown path";

/// Result of dispatching one request.
///
/// `response` is always present and always carries the request's `msg_id`;
/// `error` is set when the response describes a failure.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub response: Message,
    pub error: Option<DispatchError>,
}

/// Routes inbound messages to their handlers.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
}

impl Dispatcher {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Produce the response for `request`.
    pub async fn dispatch(&self, request: &Message) -> DispatchOutcome {
        let Some(handler) = self.registry.get(&request.path) else {
            tracing::debug!(msg_id = %request.msg_id, path = %request.path, "Unknown path");
            return DispatchOutcome {
                response: Message::reply(&request.msg_id, 400, UNKNOWN_PATH_BODY),
                error: Some(DispatchError::UnknownPath(request.path.clone())),
            };
        };

        match handler.handle(request).await {
            Ok(mut response) => {
                response.msg_id = request.msg_id.clone();
                DispatchOutcome {
                    response,
                    error: None,
                }
            }
            Err(source) => DispatchOutcome {
                response: Message::reply(&request.msg_id, source.status(), source.to_string())
                    .with_header("path", &request.path),
                error: Some(DispatchError::Handler {
                    path: request.path.clone(),
                    source,
                }),
            },
        }
    }
}
