//! Startup orchestration.
//!
//! # Responsibilities
//! - Resolve hub settings from the loaded configuration
//! - Build the connector, backend caller and dispatch table
//! - Assemble the session manager
//!
//! # Design Decisions
//! - Fail fast: unusable credentials or backend address abort startup
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (in the binary), after the session exists

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::backend::{BackendCaller, BackendError};
use crate::config::BridgeConfig;
use crate::dispatch::{handlers::standard_registry, Dispatcher};
use crate::session::{HubSettings, SessionManager};
use crate::transport::{TransportError, WsConnector};

/// Fatal startup errors.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("hub transport: {0}")]
    Transport(#[from] TransportError),

    #[error("backend: {0}")]
    Backend(#[from] BackendError),
}

/// Build the hub session described by `config`.
pub fn build_session(config: &BridgeConfig) -> Result<Arc<SessionManager>, StartupError> {
    let settings = HubSettings::resolve(&config.hub);
    let connector = WsConnector::new(&settings.address, settings.cert_file.as_deref())?;

    let caller = BackendCaller::new(
        &config.backend.root_address,
        Duration::from_secs(config.backend.call_timeout_secs),
    )?;
    let registry = standard_registry(Arc::new(caller));
    tracing::info!(
        backend = %config.backend.root_address,
        paths = ?registry.paths(),
        "Dispatch table ready"
    );

    Ok(Arc::new(SessionManager::new(
        settings,
        Arc::new(connector),
        Dispatcher::new(registry),
    )))
}
