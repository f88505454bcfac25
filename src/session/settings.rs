//! Resolved hub session settings.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::HubConfig;

/// Hub address used when none is configured.
pub const DEFAULT_HUB_ADDRESS: &str = "localhost:50051";

/// Stream open timeout used when none is configured.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Hub settings with every default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubSettings {
    pub address: String,
    pub cert_file: Option<PathBuf>,
    pub connect_timeout: Duration,
    pub poll_frequency: Duration,
    pub connect_fail_sleep: Duration,
}

impl HubSettings {
    /// Apply defaults to `config`, warning about every value that was missing.
    pub fn resolve(config: &HubConfig) -> Self {
        let address = match config.address.as_deref().map(str::trim) {
            Some(address) if !address.is_empty() => address.to_string(),
            _ => {
                tracing::warn!(
                    default = DEFAULT_HUB_ADDRESS,
                    "No hub address configured, using default"
                );
                DEFAULT_HUB_ADDRESS.to_string()
            }
        };

        let connect_timeout = match config.connect_timeout_secs {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                tracing::warn!(
                    default_secs = DEFAULT_CONNECT_TIMEOUT.as_secs(),
                    "No hub connect timeout configured, using default"
                );
                DEFAULT_CONNECT_TIMEOUT
            }
        };

        let cert_file = config
            .cert_file
            .as_deref()
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        let settings = Self {
            address,
            cert_file,
            connect_timeout,
            poll_frequency: Duration::from_millis(config.poll_frequency_ms),
            connect_fail_sleep: Duration::from_millis(config.connect_fail_sleep_ms),
        };

        tracing::debug!(
            address = %settings.address,
            tls = settings.cert_file.is_some(),
            connect_timeout_ms = settings.connect_timeout.as_millis() as u64,
            poll_frequency_ms = config.poll_frequency_ms,
            connect_fail_sleep_ms = config.connect_fail_sleep_ms,
            "Hub settings resolved"
        );
        settings
    }
}

impl Default for HubSettings {
    fn default() -> Self {
        Self::resolve(&HubConfig::default())
    }
}
