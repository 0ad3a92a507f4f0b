//! Handles application configuration loading and management.
//!
//! This module defines the `AppConfig` struct which holds configuration
//! parameters like the object-store listing URL and the connectivity probe
//! settings. It provides the `load_config` function to read these settings
//! from an INI file.

use configparser::ini::Ini;
use log::{debug, error, info};

use super::errors::ConfigError;

/// Default interval between connectivity probes, in seconds.
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 5;

/// Holds the application's configuration parameters.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Base URL of the object-store listing endpoint.
    pub storage_url: String,
    /// Prefix under which media objects are listed. May be empty.
    pub storage_prefix: String,
    /// URL probed to determine network reachability. Defaults to `storage_url`.
    pub probe_url: String,
    /// Seconds between reachability probes.
    pub probe_interval_secs: u64,
}

/// Loads application configuration from the specified INI file path.
///
/// Reads settings from the `[settings]` section of the INI file. Only
/// `storage_url` is required; the remaining keys have defaults.
///
/// # Errors
/// Returns `ConfigError` if the file cannot be read, is malformed,
/// if `storage_url` is missing, or if a present value cannot be parsed.
#[must_use = "loading configuration can fail, the Result must be handled"]
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    info!("Attempting to load config from: {}", path);
    let mut config_parser = Ini::new();

    config_parser.load(path).map_err(|e| {
        error!("Error loading config file '{}': {}", path, e);
        if e.to_lowercase().contains("os error 2") || e.to_lowercase().contains("failed to read") {
            ConfigError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, e))
        } else {
            ConfigError::Parse(e)
        }
    })?;

    let get_optional = |key_name: &str| config_parser.get("settings", key_name);

    let storage_url = get_optional("storage_url").ok_or_else(|| {
        error!(
            "Missing configuration key 'storage_url' in section '[settings]' of file '{}'",
            path
        );
        ConfigError::MissingKey("storage_url".to_string())
    })?;
    debug!("Loaded config value for key 'storage_url': {}", storage_url);

    let storage_prefix = get_optional("storage_prefix").unwrap_or_default();
    debug!("Loaded config value for key 'storage_prefix': '{}'", storage_prefix);

    let probe_url = get_optional("probe_url").unwrap_or_else(|| storage_url.clone());
    debug!("Loaded config value for key 'probe_url': {}", probe_url);

    let probe_interval_secs = match get_optional("probe_interval_secs") {
        Some(raw) => raw.parse::<u64>().map_err(|e| {
            error!("Invalid 'probe_interval_secs' value '{}': {}", raw, e);
            ConfigError::InvalidValue {
                key: "probe_interval_secs".to_string(),
                message: e.to_string(),
            }
        })?,
        None => DEFAULT_PROBE_INTERVAL_SECS,
    };

    let app_config = AppConfig {
        storage_url,
        storage_prefix,
        probe_url,
        probe_interval_secs,
    };
    info!("Configuration loaded successfully from {}: {:?}", path, app_config);
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn loads_full_config() {
        let file = write_config(
            "[settings]\n\
             storage_url = http://store.example/media\n\
             storage_prefix = menuboard\n\
             probe_url = http://probe.example/health\n\
             probe_interval_secs = 9\n",
        );
        let cfg = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.storage_url, "http://store.example/media");
        assert_eq!(cfg.storage_prefix, "menuboard");
        assert_eq!(cfg.probe_url, "http://probe.example/health");
        assert_eq!(cfg.probe_interval_secs, 9);
    }

    #[test]
    fn applies_defaults_for_optional_keys() {
        let file = write_config("[settings]\nstorage_url = http://store.example/media\n");
        let cfg = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.storage_prefix, "");
        assert_eq!(cfg.probe_url, cfg.storage_url);
        assert_eq!(cfg.probe_interval_secs, DEFAULT_PROBE_INTERVAL_SECS);
    }

    #[test]
    fn missing_storage_url_is_an_error() {
        let file = write_config("[settings]\nprobe_interval_secs = 5\n");
        match load_config(file.path().to_str().unwrap()) {
            Err(ConfigError::MissingKey(key)) => assert_eq!(key, "storage_url"),
            other => panic!("expected MissingKey, got {:?}", other),
        }
    }

    #[test]
    fn invalid_interval_is_an_error() {
        let file = write_config("[settings]\nstorage_url = http://s\nprobe_interval_secs = soon\n");
        match load_config(file.path().to_str().unwrap()) {
            Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, "probe_interval_secs"),
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }
}
