//! Configuration loading for the command line tool

use std::fs;
use std::path::{Path, PathBuf};

use msnp_core::MsnpConfig;
use tracing::{debug, info};

use crate::error::{CliError, Result};

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// `<config dir>/msnp/config.toml`, when the platform has a config directory
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("msnp").join(CONFIG_FILE_NAME))
}

/// Load the configuration from `path`, the default location, or built-in defaults
///
/// An explicit path must exist. The default location is optional.
pub fn load_configuration(path: Option<&Path>) -> Result<MsnpConfig> {
    if let Some(path) = path {
        return load_from_file(path);
    }

    match default_config_path() {
        Some(path) if path.exists() => load_from_file(&path),
        _ => {
            debug!("No configuration file found, using defaults");
            Ok(MsnpConfig::default())
        }
    }
}

/// Load and validate a configuration file
pub fn load_from_file(path: &Path) -> Result<MsnpConfig> {
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)
        .map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Parse and validate configuration text
pub fn parse_config(content: &str) -> Result<MsnpConfig> {
    let config: MsnpConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Write a configuration file, creating parent directories
pub fn save_to_file(config: &MsnpConfig, path: &Path) -> Result<()> {
    config.validate()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, to_toml(config)?)?;
    Ok(())
}

pub fn to_toml(config: &MsnpConfig) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use msnp_core::{ConnectivitySettings, TransportKind};

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, MsnpConfig::default());
    }

    #[test]
    fn test_partial_sections_fill_in_defaults() {
        let config = parse_config(
            r#"
            [connectivity]
            transport = "http_polling"
            host = "gateway.example.net"
            port = 80

            [dispatcher]
            event_buffer_size = 16
            "#,
        )
        .unwrap();

        assert_eq!(config.connectivity.transport, TransportKind::HttpPolling);
        assert_eq!(config.connectivity.host, "gateway.example.net");
        assert_eq!(config.connectivity.port, 80);
        assert_eq!(
            config.connectivity.max_frame_size,
            ConnectivitySettings::default().max_frame_size
        );
        assert_eq!(config.dispatcher.event_buffer_size, 16);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let result = parse_config("[dispatcher]\nevent_buffer_size = 0\n");
        assert!(matches!(result, Err(CliError::Protocol(_))));

        let result = parse_config("[connectivity]\nport = \"not a port\"\n");
        assert!(matches!(result, Err(CliError::TomlParsing(_))));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = MsnpConfig::default();
        config.connectivity = ConnectivitySettings::http_polling();
        config.dispatcher.event_buffer_size = 32;

        save_to_file(&config, &path).unwrap();
        let loaded = load_configuration(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_configuration(Some(&dir.path().join("missing.toml")));
        assert!(matches!(result, Err(CliError::Io(_))));
    }
}
