//! Session manager: connect, serve, reconnect, drain.
//!
//! # Responsibilities
//! - Keep exactly one stream to the hub open at a time
//! - Serve inbound requests sequentially through the dispatcher
//! - Back off after failed opens, pause between streams
//! - Own the session state, the health flag and the stop token
//! - Relay outward calls from the gateway

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::dispatch::Dispatcher;
use crate::lifecycle::InFlightTracker;
use crate::protocol::{Event, Message};
use crate::session::{
    ConnectionHealth, HealthHandle, HubSettings, SessionError, SessionObserver, SessionState,
    StreamEnd, TracingObserver,
};
use crate::transport::{HubConnector, HubStream, TransportError, UnaryCall};

/// Owns the hub session and everything it mutates.
pub struct SessionManager {
    settings: HubSettings,
    connector: Arc<dyn HubConnector>,
    dispatcher: Dispatcher,
    observer: Arc<dyn SessionObserver>,
    health: ConnectionHealth,
    state: watch::Sender<SessionState>,
    stop: CancellationToken,
    in_flight: InFlightTracker,
    running: AtomicBool,
}

/// Clears the running flag when the loop exits or is dropped.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SessionManager {
    pub fn new(
        settings: HubSettings,
        connector: Arc<dyn HubConnector>,
        dispatcher: Dispatcher,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Disconnected);
        Self {
            settings,
            connector,
            dispatcher,
            observer: Arc::new(TracingObserver),
            health: ConnectionHealth::new(),
            state,
            stop: CancellationToken::new(),
            in_flight: InFlightTracker::new(),
            running: AtomicBool::new(false),
        }
    }

    /// Replace the default [`TracingObserver`].
    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn settings(&self) -> &HubSettings {
        &self.settings
    }

    /// Read-only health flag for health-check collaborators.
    pub fn health(&self) -> HealthHandle {
        self.health.handle()
    }

    pub fn is_connected(&self) -> bool {
        self.health.is_connected()
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn in_flight(&self) -> &InFlightTracker {
        &self.in_flight
    }

    pub fn is_stopping(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Serve the hub until the stop flag is set.
    ///
    /// Returns once the loop has released its last stream. Callers that
    /// need drain to wait for the loop must register it with
    /// [`in_flight`](Self::in_flight) before spawning.
    ///
    /// Only one loop runs per session; a second concurrent call logs a
    /// warning and returns immediately.
    pub async fn run(&self) {
        if self.running.swap(true, Ordering::AcqRel) {
            tracing::warn!(address = %self.settings.address, "Hub session loop already running");
            return;
        }
        let _running = RunningGuard(&self.running);

        tracing::info!(address = %self.settings.address, "Hub session starting");

        while !self.stop.is_cancelled() {
            self.transition(SessionState::Connecting);
            self.observer.connect_attempt(&self.settings.address, self.settings.connect_timeout);

            let opened = tokio::select! {
                biased;
                _ = self.stop.cancelled() => break,
                opened = tokio::time::timeout(
                    self.settings.connect_timeout,
                    self.connector.open_stream(),
                ) => opened,
            };

            let mut stream = match opened {
                Ok(Ok(stream)) => stream,
                Ok(Err(error)) => {
                    self.connect_failed(error).await;
                    continue;
                }
                Err(_) => {
                    self.connect_failed(TransportError::ConnectTimeout(
                        self.settings.connect_timeout,
                    ))
                    .await;
                    continue;
                }
            };

            if self.stop.is_cancelled() {
                // Opened concurrently with shutdown: release it unused.
                let _ = stream.close_send().await;
                break;
            }

            let was_healthy = self.health.mark(true);
            self.observer.connected(was_healthy);
            self.transition(SessionState::Streaming);

            let end = self.serve(stream.as_mut()).await;

            if let Err(error) = stream.close_send().await {
                self.observer.close_send_failed(&error);
            }
            drop(stream);

            self.transition(SessionState::Disconnected);
            self.observer.stream_ended(&end, self.settings.poll_frequency);
            self.pause(self.settings.poll_frequency).await;
        }

        tracing::debug!("Hub session loop exited");
    }

    /// Stop the session and wait for in-flight work.
    ///
    /// Sets the stop flag, closes the shared connection (unblocking any
    /// pending receive) and resolves once the in-flight count is zero.
    pub async fn drain(&self) {
        self.stop.cancel();
        self.transition(SessionState::Draining);
        self.observer.draining(self.in_flight.active_count());

        self.connector.close().await;
        self.in_flight.wait_idle().await;

        self.transition(SessionState::Closed);
        self.observer.closed();
    }

    /// Relay a generic message to the hub.
    pub async fn send_generic(
        &self,
        message: Message,
        timeout: Duration,
    ) -> Result<Message, SessionError> {
        self.call(UnaryCall::Generic(message), timeout).await
    }

    pub async fn post_event(
        &self,
        event: Event,
        timeout: Duration,
    ) -> Result<Message, SessionError> {
        self.call(UnaryCall::PublishEvent(event), timeout).await
    }

    pub async fn put_event(
        &self,
        event: Event,
        timeout: Duration,
    ) -> Result<Message, SessionError> {
        self.call(UnaryCall::UpdateEvent(event), timeout).await
    }

    pub async fn delete_event(
        &self,
        event_id: &str,
        timeout: Duration,
    ) -> Result<Message, SessionError> {
        self.call(UnaryCall::DeleteEvent(event_id.to_string()), timeout).await
    }

    async fn call(&self, call: UnaryCall, timeout: Duration) -> Result<Message, SessionError> {
        // Registered before the stop check so drain waits for calls that got through.
        let _guard = self.in_flight.track("hub-call");
        if self.stop.is_cancelled() {
            return Err(SessionError::ShuttingDown);
        }

        let method = call.method();
        tracing::debug!(method, "Calling hub");

        match tokio::time::timeout(timeout, self.connector.call(call)).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(error)) => {
                tracing::warn!(method, error = %error, "Hub call failed");
                Err(error.into())
            }
            Err(_) => {
                tracing::warn!(
                    method,
                    timeout_ms = timeout.as_millis() as u64,
                    "Hub call timed out"
                );
                Err(SessionError::Timeout(timeout))
            }
        }
    }

    /// Inner loop over one stream.
    async fn serve(&self, stream: &mut dyn HubStream) -> StreamEnd {
        loop {
            let request = match stream.recv().await {
                Ok(Some(request)) => request,
                Ok(None) => return StreamEnd::HubClosed,
                // Drain closed the connector under a pending receive.
                Err(TransportError::Closed) if self.stop.is_cancelled() => {
                    return StreamEnd::Stopped;
                }
                Err(error) => {
                    self.health.mark(false);
                    return StreamEnd::ReadFailed(error);
                }
            };

            self.observer.request_received(&request);
            let started = Instant::now();
            let outcome = self.dispatcher.dispatch(&request).await;
            self.observer.dispatched(&request, &outcome, started.elapsed());

            if let Err(error) = stream.send(&outcome.response).await {
                self.health.mark(false);
                self.observer.send_failed(&request, &error);
            }

            if self.stop.is_cancelled() {
                return StreamEnd::Stopped;
            }
        }
    }

    async fn connect_failed(&self, error: TransportError) {
        self.health.mark(false);
        self.transition(SessionState::Disconnected);
        self.observer.connect_failed(&error, self.settings.connect_fail_sleep);
        self.pause(self.settings.connect_fail_sleep).await;
    }

    /// Sleep for `duration` or until the stop flag is set.
    async fn pause(&self, duration: Duration) {
        if duration.is_zero() {
            tokio::task::yield_now().await;
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.stop.cancelled() => {}
        }
    }

    /// Apply a state change if it is a valid transition; ignore it otherwise.
    fn transition(&self, next: SessionState) {
        let mut previous = None;
        self.state.send_if_modified(|current| {
            if *current == next || !current.can_transition_to(next) {
                return false;
            }
            previous = Some(*current);
            *current = next;
            true
        });

        if let Some(from) = previous {
            self.observer.state_changed(from, next);
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("address", &self.settings.address)
            .field("state", &self.state())
            .field("connected", &self.is_connected())
            .field("in_flight", &self.in_flight.active_count())
            .finish()
    }
}
