//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global tracing subscriber
//! - Resolve the level from `RUST_LOG` or the config file
//! - Optionally mirror every line into a log file

use std::fs::OpenOptions;
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot open log file '{path}': {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("logging already initialized: {0}")]
    Init(String),
}

/// Install the global subscriber described by `config`.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let (filter, level_warning) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, None),
        Err(_) => match parse_level(&config.level) {
            Ok(level) => (EnvFilter::default().add_directive(level.into()), None),
            Err(warning) => (
                EnvFilter::default().add_directive(LevelFilter::INFO.into()),
                Some(warning),
            ),
        },
    };

    let file_layer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LoggingError::File {
                    path: path.clone(),
                    source,
                })?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    if let Some(warning) = level_warning {
        tracing::warn!("{}", warning);
    }
    match &config.file {
        Some(path) => tracing::info!(path = %path, "Logging to file enabled"),
        None => tracing::warn!("No log file location set, logging to stdout only"),
    }
    Ok(())
}

/// Parse a configured level name.
pub fn parse_level(level: &str) -> Result<LevelFilter, String> {
    level.trim().parse::<LevelFilter>().map_err(|e| {
        format!(
            "Could not parse level '{}', falling back to default (info). Error: {}",
            level, e
        )
    })
}
