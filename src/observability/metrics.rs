//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bridge_connect_attempts_total` (counter): stream opens by outcome
//! - `bridge_connection_healthy` (gauge): 1=stream usable, 0=not
//! - `bridge_dispatch_total` (counter): dispatched requests by path, status
//! - `bridge_dispatch_duration_seconds` (histogram): handler latency by path
//! - `bridge_send_failures_total` (counter): responses that could not be sent
//! - `bridge_streams_total` (counter): ended streams by reason

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_connect_attempt(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("bridge_connect_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_connection_health(healthy: bool) {
    gauge!("bridge_connection_healthy").set(if healthy { 1.0 } else { 0.0 });
}

/// `path` must be a registered path or a fixed placeholder, never raw input.
pub fn record_dispatch(path: &str, status: i32, elapsed: Duration) {
    counter!(
        "bridge_dispatch_total",
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("bridge_dispatch_duration_seconds", "path" => path.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_send_failure() {
    counter!("bridge_send_failures_total").increment(1);
}

pub fn record_stream_end(reason: &'static str) {
    counter!("bridge_streams_total", "end" => reason).increment(1);
}
