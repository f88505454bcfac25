//! Structured session events.
//!
//! The session reports everything it does through [`SessionObserver`].
//! [`TracingObserver`] turns the events into log lines and metrics; tests
//! plug in recorders instead.

use std::time::Duration;

use crate::dispatch::{DispatchError, DispatchOutcome};
use crate::observability::metrics;
use crate::protocol::Message;
use crate::session::SessionState;
use crate::transport::TransportError;

/// Why a stream's inner loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// The hub closed its send side.
    HubClosed,
    /// A receive failed; treated as stream loss.
    ReadFailed(TransportError),
    /// The stop flag was set.
    Stopped,
}

impl StreamEnd {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamEnd::HubClosed => "hub_closed",
            StreamEnd::ReadFailed(_) => "read_failed",
            StreamEnd::Stopped => "stopped",
        }
    }
}

/// Receiver of session events. Every method defaults to a no-op.
#[allow(unused_variables)]
pub trait SessionObserver: Send + Sync {
    fn state_changed(&self, from: SessionState, to: SessionState) {}

    fn connect_attempt(&self, address: &str, timeout: Duration) {}

    fn connect_failed(&self, error: &TransportError, retry_in: Duration) {}

    /// A stream opened. `was_healthy` is the health flag before the open.
    fn connected(&self, was_healthy: bool) {}

    fn request_received(&self, request: &Message) {}

    fn dispatched(&self, request: &Message, outcome: &DispatchOutcome, elapsed: Duration) {}

    fn send_failed(&self, request: &Message, error: &TransportError) {}

    fn close_send_failed(&self, error: &TransportError) {}

    fn stream_ended(&self, end: &StreamEnd, reconnect_in: Duration) {}

    fn draining(&self, in_flight: u64) {}

    fn closed(&self) {}
}

/// Logs every event with `tracing` and records metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn state_changed(&self, from: SessionState, to: SessionState) {
        tracing::debug!(from = %from, to = %to, "Session state changed");
    }

    fn connect_attempt(&self, address: &str, timeout: Duration) {
        tracing::debug!(
            address,
            timeout_ms = timeout.as_millis() as u64,
            "Opening hub stream"
        );
    }

    fn connect_failed(&self, error: &TransportError, retry_in: Duration) {
        metrics::record_connect_attempt(false);
        metrics::record_connection_health(false);
        tracing::error!(
            error = %error,
            retry_in_ms = retry_in.as_millis() as u64,
            "Could not connect to hub"
        );
    }

    fn connected(&self, was_healthy: bool) {
        metrics::record_connect_attempt(true);
        metrics::record_connection_health(true);
        if was_healthy {
            tracing::debug!("Hub stream opened");
        } else {
            tracing::info!("Connected to hub");
        }
    }

    fn request_received(&self, request: &Message) {
        tracing::debug!(msg_id = %request.msg_id, path = %request.path, "Request received");
    }

    fn dispatched(&self, request: &Message, outcome: &DispatchOutcome, elapsed: Duration) {
        let label = match &outcome.error {
            Some(DispatchError::UnknownPath(_)) => "unknown",
            _ => request.path.as_str(),
        };
        metrics::record_dispatch(label, outcome.response.status, elapsed);

        match &outcome.error {
            None => tracing::debug!(
                msg_id = %request.msg_id,
                path = %request.path,
                status = outcome.response.status,
                duration_ms = elapsed.as_millis() as u64,
                "Request handled"
            ),
            Some(error) => tracing::warn!(
                msg_id = %request.msg_id,
                path = %request.path,
                status = outcome.response.status,
                error = %error,
                "Request failed, responding with error"
            ),
        }
    }

    fn send_failed(&self, request: &Message, error: &TransportError) {
        metrics::record_send_failure();
        metrics::record_connection_health(false);
        tracing::error!(
            msg_id = %request.msg_id,
            path = %request.path,
            error = %error,
            "Could not send response to hub"
        );
    }

    fn close_send_failed(&self, error: &TransportError) {
        tracing::warn!(error = %error, "Could not half-close hub stream");
    }

    fn stream_ended(&self, end: &StreamEnd, reconnect_in: Duration) {
        metrics::record_stream_end(end.as_str());
        match end {
            StreamEnd::ReadFailed(error) => {
                metrics::record_connection_health(false);
                tracing::error!(
                    error = %error,
                    reconnect_in_ms = reconnect_in.as_millis() as u64,
                    "Hub stream lost"
                );
            }
            StreamEnd::HubClosed => tracing::debug!(
                reconnect_in_ms = reconnect_in.as_millis() as u64,
                "Hub closed the stream"
            ),
            StreamEnd::Stopped => tracing::debug!("Stream stopped for shutdown"),
        }
    }

    fn draining(&self, in_flight: u64) {
        tracing::info!(in_flight, "Draining hub session");
    }

    fn closed(&self) {
        metrics::record_connection_health(false);
        tracing::info!("Hub session closed");
    }
}
