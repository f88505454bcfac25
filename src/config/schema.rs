//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from the TOML file.

use serde::{Deserialize, Serialize};

/// Root configuration for the bridge.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BridgeConfig {
    /// Hub connection settings.
    pub hub: HubConfig,

    /// Backend REST API settings.
    pub backend: BackendConfig,

    /// Inbound REST gateway settings.
    pub gateway: GatewayConfig,

    /// Log level and optional log file.
    pub logging: LoggingConfig,

    /// Metrics exporter settings.
    pub observability: ObservabilityConfig,
}

/// Hub connection configuration.
///
/// `address` and `connect_timeout_secs` are optional on purpose: the
/// session falls back to defaults and logs a warning when they are absent.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HubConfig {
    /// Hub address (`host:port`).
    pub address: Option<String>,

    /// PEM file with the CA certificate(s) to trust. Enables TLS.
    pub cert_file: Option<String>,

    /// Bound on opening one stream, in seconds.
    pub connect_timeout_secs: Option<u64>,

    /// Pause between a stream ending and the next open, in milliseconds.
    pub poll_frequency_ms: u64,

    /// Pause after a failed open, in milliseconds.
    pub connect_fail_sleep_ms: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            address: None,
            cert_file: None,
            connect_timeout_secs: None,
            poll_frequency_ms: 0,
            connect_fail_sleep_ms: 5_000,
        }
    }
}

/// Backend REST API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Root address every handler endpoint hangs off.
    pub root_address: String,

    /// Timeout of a single backend call, in seconds.
    pub call_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            root_address: "http://localhost:8080".to_string(),
            call_timeout_secs: 30,
        }
    }
}

/// Inbound REST gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Serve the gateway at all.
    pub enabled: bool,

    /// Bind address (e.g., "0.0.0.0:8085").
    pub bind_address: String,

    /// Timeout of one relayed hub call, in seconds. Raised to 1 when lower.
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:8085".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub level: String,

    /// Append log lines to this file in addition to stdout.
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
