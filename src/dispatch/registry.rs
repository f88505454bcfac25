//! Path → handler table.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::dispatch::HandlerError;
use crate::protocol::Message;

/// Adapts one inbound message into one backend call and a response.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: &Message) -> Result<Message, HandlerError>;
}

/// Handler backed by an async closure.
pub struct FnHandler<F>(F);

/// Wrap an async closure as a [`Handler`].
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Message) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Message, HandlerError>> + Send,
{
    FnHandler(f)
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Message) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Message, HandlerError>> + Send,
{
    async fn handle(&self, request: &Message) -> Result<Message, HandlerError> {
        (self.0)(request.clone()).await
    }
}

/// Static mapping from routing path to handler.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `path`, returning the handler it replaced.
    pub fn register<H>(&mut self, path: impl Into<String>, handler: H) -> Option<Arc<dyn Handler>>
    where
        H: Handler + 'static,
    {
        self.handlers.insert(path.into(), Arc::new(handler))
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<H>(mut self, path: impl Into<String>, handler: H) -> Self
    where
        H: Handler + 'static,
    {
        self.register(path, handler);
        self
    }

    pub fn get(&self, path: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.handlers.contains_key(path)
    }

    /// Registered paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("paths", &self.paths())
            .finish()
    }
}
