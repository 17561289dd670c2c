/// Logger configuration and per-module debug gating
///
/// The configuration is derived once from command-line arguments at startup
/// (init_from_args) and can be updated at runtime for tests.

use super::levels::LogLevel;
use super::tags::LogTag;
use crate::arguments;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::RwLock;

/// Runtime logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Minimum level printed to the console (Error always passes)
    pub min_level: LogLevel,

    /// Debug keys enabled via --debug-<module> flags
    pub debug_tags: HashSet<String>,

    /// Verbose keys enabled via --verbose-<module> flags
    pub verbose_tags: HashSet<String>,

    /// When non-empty, only these tags are logged at all
    pub enabled_tags: HashSet<String>,

    /// Mirror console output into the daily log file
    pub file_output: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
            verbose_tags: HashSet::new(),
            enabled_tags: HashSet::new(),
            file_output: true,
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

/// Get a copy of the current logger configuration
pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG
        .read()
        .map(|c| c.clone())
        .unwrap_or_default()
}

/// Replace the logger configuration
pub fn set_logger_config(config: LoggerConfig) {
    if let Ok(mut current) = LOGGER_CONFIG.write() {
        *current = config;
    }
}

/// Update the logger configuration in place
pub fn update_logger_config<F>(f: F)
where
    F: FnOnce(&mut LoggerConfig),
{
    if let Ok(mut current) = LOGGER_CONFIG.write() {
        f(&mut current);
    }
}

/// Build the configuration from command-line arguments
///
/// Scans for:
/// - `--debug` (all modules at Debug)
/// - `--debug-<module>` per-module Debug
/// - `--verbose` (everything at Verbose)
/// - `--verbose-<module>` per-module Verbose
/// - `--quiet` (Warning minimum)
pub fn init_from_args() {
    let args = arguments::get_cmd_args();

    let mut config = LoggerConfig::default();

    if arguments::has_arg("--quiet") {
        config.min_level = LogLevel::Warning;
    }

    if arguments::has_arg("--verbose") {
        config.min_level = LogLevel::Verbose;
    } else if arguments::has_arg("--debug") || args.iter().any(|a| a.starts_with("--debug-")) {
        config.min_level = LogLevel::Debug;
    }

    for arg in &args {
        if let Some(key) = arg.strip_prefix("--debug-") {
            config.debug_tags.insert(key.to_string());
        }
        if let Some(key) = arg.strip_prefix("--verbose-") {
            config.verbose_tags.insert(key.to_string());
        }
    }

    set_logger_config(config);
}

/// Check whether debug output is enabled for a tag
pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    if arguments::has_arg("--debug") {
        return true;
    }
    let config = get_logger_config();
    config.debug_tags.contains(&tag.to_debug_key())
}

/// Check whether verbose output is enabled for a tag
pub fn is_verbose_enabled_for_tag(tag: &LogTag) -> bool {
    let config = get_logger_config();
    config.verbose_tags.contains(&tag.to_debug_key())
}
