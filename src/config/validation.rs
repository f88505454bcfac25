//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and URLs before any subsystem is built
//! - Validate value ranges (timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Pure function: BridgeConfig → Result<(), Vec<ValidationError>>
//! - Certificate contents are checked when the connector is built, not here

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::BridgeConfig;

/// One semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check `config`, collecting every error.
pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // A blank address is treated as unset and defaulted later.
    if let Some(address) = &config.hub.address {
        if address.contains("://") {
            errors.push(ValidationError::new(
                "hub.address",
                format!("'{}' must be host:port without a scheme", address),
            ));
        }
    }

    if let Some(cert_file) = &config.hub.cert_file {
        if cert_file.trim().is_empty() {
            errors.push(ValidationError::new("hub.cert_file", "must not be empty when set"));
        }
    }

    match Url::parse(&config.backend.root_address) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            "backend.root_address",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(
            "backend.root_address",
            format!("'{}' is not a URL: {}", config.backend.root_address, e),
        )),
    }

    if config.backend.call_timeout_secs == 0 {
        errors.push(ValidationError::new("backend.call_timeout_secs", "must be > 0"));
    }

    if config.gateway.enabled && config.gateway.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "gateway.bind_address",
            format!("'{}' is not a socket address", config.gateway.bind_address),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
