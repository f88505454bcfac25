//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::BridgeConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<BridgeConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<BridgeConfig, ConfigError> {
    let config: BridgeConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load from `path` when given, otherwise validate and return the defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<BridgeConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let config = BridgeConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[hub]\naddress = \"hub.local:50051\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.hub.address.as_deref(), Some("hub.local:50051"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/hub-bridge.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn syntax_errors_are_parse_errors() {
        let err = parse_config("[hub\naddress=").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn empty_hub_address_is_accepted() {
        let config = parse_config("[hub]\naddress = \"\"").unwrap();
        assert_eq!(config.hub.address.as_deref(), Some(""));
    }

    #[test]
    fn validation_errors_are_joined() {
        let err = parse_config("[backend]\nroot_address = \"nope\"\ncall_timeout_secs = 0")
            .unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("Validation failed: backend.root_address"));
        assert!(text.contains(", backend.call_timeout_secs: must be > 0"));
    }

    #[test]
    fn defaults_without_a_path() {
        let config = load_or_default(None).unwrap();
        assert_eq!(config.backend.root_address, "http://localhost:8080");
    }
}
