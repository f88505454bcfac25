//! Gateway server setup.
//!
//! # Responsibilities
//! - Create the axum Router with all handlers
//! - Wire up middleware (tracing, overall timeout)
//! - Serve until the shutdown broadcast fires

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::gateway::handlers::{self, GatewayState};
use crate::session::SessionManager;

/// Shortest per-call timeout the gateway accepts.
pub const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Headroom the HTTP-level timeout leaves over one hub call.
const RESPONSE_GRACE: Duration = Duration::from_secs(5);

/// Per-call timeout for `secs`, raised to [`MIN_REQUEST_TIMEOUT`] with a warning.
pub fn effective_request_timeout(secs: u64) -> Duration {
    let timeout = Duration::from_secs(secs);
    if timeout < MIN_REQUEST_TIMEOUT {
        tracing::warn!(
            configured_secs = secs,
            "Gateway request timeout not set or below 1 second, using 1 second"
        );
        return MIN_REQUEST_TIMEOUT;
    }
    timeout
}

/// REST gateway relaying calls to the hub session.
pub struct GatewayServer {
    router: Router,
}

impl GatewayServer {
    pub fn new(config: &GatewayConfig, session: Arc<SessionManager>) -> Self {
        let state = GatewayState {
            session,
            request_timeout: effective_request_timeout(config.request_timeout_secs),
        };
        Self {
            router: Self::build_router(state),
        }
    }

    #[allow(deprecated)]
    fn build_router(state: GatewayState) -> Router {
        let overall = state.request_timeout + RESPONSE_GRACE;
        Router::new()
            .route("/ping", get(handlers::ping))
            .route("/alive", get(handlers::alive))
            .route("/health", get(handlers::health))
            .route("/generic", post(handlers::generic))
            .route(
                "/events",
                post(handlers::post_event).put(handlers::put_event),
            )
            .route("/events/{id}", delete(handlers::delete_event))
            .with_state(state)
            .layer(TimeoutLayer::new(overall))
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for serving on a custom listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires (or its sender is dropped).
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Gateway listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }
}
