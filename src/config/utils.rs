use super::schemas::Config;
/// Configuration utilities - loading, reloading, and access helpers
///
/// This module provides utility functions for working with the configuration system:
/// - Loading configuration from disk
/// - Hot-reloading configuration at runtime
/// - Thread-safe access helpers
use crate::arguments;
use crate::errors::ConfigurationError;
use crate::paths;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Global configuration instance
///
/// This is the single source of truth for all configuration values.
/// Access it using the helper functions below.
pub static CONFIG: OnceCell<RwLock<Config>> = OnceCell::new();

/// Resolve the config file path: --config argument or the platform default
pub fn resolve_config_path() -> PathBuf {
    match arguments::get_config_path_arg() {
        Some(path) => PathBuf::from(path),
        None => paths::get_config_path(),
    }
}

/// Load configuration from disk and initialize the global CONFIG
///
/// This should be called once at startup. If the config file doesn't exist,
/// it will use default values from the schema definitions.
pub fn load_config() -> Result<(), ConfigurationError> {
    load_config_from_path(&resolve_config_path())
}

/// Load configuration from a specific file path
pub fn load_config_from_path(path: &Path) -> Result<(), ConfigurationError> {
    let config = if path.exists() {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigurationError::Io {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        toml::from_str::<Config>(&contents).map_err(|e| ConfigurationError::Parse {
            path: path.display().to_string(),
            error: e.to_string(),
        })?
    } else {
        // Use defaults if file doesn't exist
        eprintln!(
            "Config file '{}' not found, using default values",
            path.display()
        );
        Config::default()
    };

    CONFIG
        .set(RwLock::new(config))
        .map_err(|_| ConfigurationError::InvalidValue {
            field: "config".to_string(),
            reason: "already initialized".to_string(),
        })?;

    Ok(())
}

/// Initialize the global config with an explicit value
///
/// First caller wins; later calls are no-ops. Used by tests and tools that
/// need a config without touching the filesystem.
pub fn init_config_with(config: Config) {
    let _ = CONFIG.set(RwLock::new(config));
}

/// Reload configuration from disk
///
/// This allows hot-reloading configuration changes without restarting the
/// application. The configuration is atomically replaced, so reads are
/// always consistent.
pub fn reload_config() -> Result<(), ConfigurationError> {
    reload_config_from_path(&resolve_config_path())
}

/// Reload configuration from a specific file path
pub fn reload_config_from_path(path: &Path) -> Result<(), ConfigurationError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigurationError::Io {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    let new_config = toml::from_str::<Config>(&contents).map_err(|e| ConfigurationError::Parse {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    match CONFIG.get() {
        Some(config_lock) => {
            let mut config = config_lock
                .write()
                .map_err(|e| ConfigurationError::InvalidValue {
                    field: "config".to_string(),
                    reason: format!("write lock poisoned: {}", e),
                })?;
            *config = new_config;
            Ok(())
        }
        None => Err(ConfigurationError::InvalidValue {
            field: "config".to_string(),
            reason: "not initialized, call load_config() first".to_string(),
        }),
    }
}

/// Execute a function with read access to the configuration
///
/// This is the recommended way to read configuration values.
/// The closure receives an immutable reference to the Config.
///
/// # Example
/// ```
/// # reversalbot::config::init_config_with(Default::default());
/// use reversalbot::config::with_config;
///
/// let max_positions = with_config(|cfg| cfg.trading.max_open_positions);
/// ```
pub fn with_config<F, R>(f: F) -> R
where
    F: FnOnce(&Config) -> R,
{
    let config_lock = CONFIG
        .get()
        .expect("Config not initialized. Call load_config() first.");

    let config = config_lock
        .read()
        .expect("Failed to acquire config read lock");

    f(&config)
}

/// Get a clone of the entire configuration
///
/// This is useful when you need to hold onto config values across await
/// points. Note: this clones the entire config, so use with_config() for
/// simple reads.
pub fn get_config_clone() -> Config {
    with_config(|cfg| cfg.clone())
}

/// Save the current configuration to disk
///
/// Writes the current in-memory configuration to the given path (or the
/// resolved default). Useful for persisting runtime changes.
pub fn save_config(path: Option<&Path>) -> Result<(), ConfigurationError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => resolve_config_path(),
    };

    let config_str = with_config(|cfg| {
        toml::to_string_pretty(cfg).map_err(|e| ConfigurationError::InvalidValue {
            field: "config".to_string(),
            reason: format!("serialization failed: {}", e),
        })
    })?;

    std::fs::write(&path, config_str).map_err(|e| ConfigurationError::Io {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    Ok(())
}

/// Resolve broker credentials from config or environment
///
/// Order: config values win; empty config fields fall back to the
/// APCA_API_KEY_ID / APCA_API_SECRET_KEY environment variables.
pub fn broker_credentials() -> Result<(String, String), ConfigurationError> {
    let (mut key_id, mut secret) = with_config(|cfg| {
        (cfg.broker.api_key_id.clone(), cfg.broker.api_secret_key.clone())
    });

    if key_id.is_empty() {
        key_id = std::env::var("APCA_API_KEY_ID").unwrap_or_default();
    }
    if secret.is_empty() {
        secret = std::env::var("APCA_API_SECRET_KEY").unwrap_or_default();
    }

    if key_id.is_empty() || secret.is_empty() {
        return Err(ConfigurationError::MissingCredentials);
    }

    Ok((key_id, secret))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_missing_path_uses_defaults() {
        // CONFIG is a process-wide OnceCell; another test module may have
        // initialized it already, in which case load reports the conflict.
        let missing = PathBuf::from("/nonexistent/reversalbot-test-config.toml");
        let result = load_config_from_path(&missing);

        if result.is_ok() {
            let quantity = with_config(|cfg| cfg.trading.quantity);
            assert_eq!(quantity, 1.0);
        }

        // Either way the global is now set and double-init fails
        assert!(load_config_from_path(&missing).is_err());
    }

    #[test]
    fn test_parse_error_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is not {{ valid toml").unwrap();

        let result = reload_config_from_path(file.path());
        assert!(result.is_err());
    }
}
