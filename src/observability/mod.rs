//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events, stdout + optional file)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Session events:
//!     SessionObserver (session/observer.rs)
//!     → TracingObserver → logging + metrics
//!
//! Consumers:
//!     → Log file / stdout
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields (msg_id, path, status) on every event
//! - Metrics are cheap no-ops until an exporter is installed
//! - Core control flow never depends on logging succeeding

pub mod logging;
pub mod metrics;
