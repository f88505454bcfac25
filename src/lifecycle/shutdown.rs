//! Shutdown coordination.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};

use crate::session::SessionManager;

/// Process-wide shutdown signal.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of tasks still subscribed.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a session loop and drains it when shutdown is signalled.
pub struct ShutdownCoordinator {
    session: Arc<SessionManager>,
    session_loop: JoinHandle<()>,
    watcher: JoinHandle<()>,
}

impl ShutdownCoordinator {
    /// Start `session` in the background and drain it on `signal`.
    ///
    /// A closed signal channel counts as a shutdown request.
    pub fn spawn(session: Arc<SessionManager>, mut signal: broadcast::Receiver<()>) -> Self {
        let guard = session.in_flight().track("session-loop");
        let runner = Arc::clone(&session);
        let session_loop = tokio::spawn(async move {
            let _guard = guard;
            runner.run().await;
        });

        let drainer = Arc::clone(&session);
        let watcher = tokio::spawn(async move {
            match signal.recv().await {
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::warn!("Shutdown channel closed, draining hub session")
                }
                _ => tracing::info!("Shutdown signal received, draining hub session"),
            }
            drainer.drain().await;
        });

        Self {
            session,
            session_loop,
            watcher,
        }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Resolve once the drain finished and the loop task has exited.
    pub async fn wait(self) -> Result<(), JoinError> {
        self.watcher.await?;
        self.session_loop.await?;
        tracing::info!("Hub session drained");
        Ok(())
    }
}
