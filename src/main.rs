//! Hub protocol bridge.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────┐
//!                 │                  HUB BRIDGE                  │
//!                 │                                              │
//!   Hub stream    │  ┌───────────┐   ┌────────────┐   ┌────────┐ │
//!   ◀────────────▶│  │  session  │──▶│  dispatch  │──▶│backend │─┼──▶ Backend
//!   (WebSocket)   │  │  manager  │◀──│  registry  │◀──│ caller │ │    REST API
//!                 │  └─────▲─────┘   └────────────┘   └────────┘ │
//!                 │        │ outward calls                       │
//!   HTTP clients  │  ┌─────┴─────┐                               │
//!   ─────────────▶│  │  gateway  │                               │
//!                 │  └───────────┘                               │
//!                 │                                              │
//!                 │  config · lifecycle · observability          │
//!                 └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use hub_bridge::config::loader::load_or_default;
use hub_bridge::gateway::GatewayServer;
use hub_bridge::lifecycle::signals::wait_for_signal;
use hub_bridge::lifecycle::startup::build_session;
use hub_bridge::lifecycle::{Shutdown, ShutdownCoordinator};
use hub_bridge::observability::{logging::init_logging, metrics::init_metrics};

#[derive(Parser, Debug)]
#[command(name = "hub-bridge", version)]
#[command(about = "Bridges the hub stream to the backend REST API", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults are used when absent.
    #[arg(short, long, env = "HUB_BRIDGE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_or_default(cli.config.as_deref())?;
    init_logging(&config.logging)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "hub-bridge starting");
    tracing::info!(
        config_file = ?cli.config,
        backend = %config.backend.root_address,
        gateway_enabled = config.gateway.enabled,
        gateway_bind = %config.gateway.bind_address,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let session = build_session(&config)?;
    let shutdown = Shutdown::new();
    let coordinator = ShutdownCoordinator::spawn(Arc::clone(&session), shutdown.subscribe());

    let gateway = if config.gateway.enabled {
        let listener = TcpListener::bind(&config.gateway.bind_address).await?;
        let server = GatewayServer::new(&config.gateway, Arc::clone(&session));
        let signal = shutdown.subscribe();
        Some(tokio::spawn(async move {
            if let Err(e) = server.run(listener, signal).await {
                tracing::error!(error = %e, "Gateway failed");
            }
        }))
    } else {
        tracing::info!("Gateway disabled");
        None
    };

    wait_for_signal().await;
    tracing::info!("Shutting down, waiting for in-flight work");
    shutdown.trigger();

    tokio::select! {
        result = coordinator.wait() => result?,
        _ = wait_for_signal() => {
            tracing::warn!("Second signal received, forcing exit");
            std::process::exit(1);
        }
    }

    if let Some(gateway) = gateway {
        let _ = gateway.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
