//! Structured logging system for ReversalBot
//!
//! This module provides a clean, ergonomic logging API with:
//! - Automatic debug mode filtering from command-line arguments
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-module debug control via --debug-<module> flags
//! - Dual output: colored console + file persistence
//!
//! ## Usage
//!
//! ```rust
//! use reversalbot::logger::{self, log, LogTag};
//!
//! // Tag + free-form type string (the common call style)
//! log(LogTag::Trader, "ENTRY", "Opened SPY long at 534.20");
//!
//! // Level-specific functions
//! logger::error(LogTag::Broker, "Connection failed");
//! logger::warning(LogTag::MarketData, "Rate limit approaching");
//! logger::info(LogTag::Trader, "Position opened");
//! logger::debug(LogTag::Broker, "Request details: ..."); // Only if --debug-broker
//! ```
//!
//! ## Initialization
//!
//! Call once at startup (in main.rs or run.rs):
//! ```rust
//! # use reversalbot::logger;
//! logger::init();
//! ```
//!
//! This automatically:
//! - Scans command-line arguments for --debug-<module> flags
//! - Configures per-module debug modes
//! - Initializes file logging
//! - Sets up filtering rules

mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

// Re-export public types
pub use config::{
    get_logger_config, init_from_args, set_logger_config, update_logger_config, LoggerConfig,
};
pub use core::should_log;
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger system
///
/// This must be called once at application startup, before any logging occurs.
/// It will:
/// 1. Parse command-line arguments for debug flags
/// 2. Configure per-module debug modes
/// 3. Initialize file logging system
pub fn init() {
    config::init_from_args();
    file::init_file_logging();
}

/// Log with a free-form type string
///
/// The level used for filtering is derived from the type string:
/// ERROR → Error, WARN/WARNING → Warning, DEBUG → Debug,
/// VERBOSE/TRACE → Verbose, everything else (SUCCESS, ENTRY, ...) → Info.
/// The type string itself is kept for display.
pub fn log(tag: LogTag, log_type: &str, message: &str) {
    let level = LogLevel::from_str(log_type).unwrap_or(LogLevel::Info);
    core::log_internal(tag, level, log_type, message);
}

/// Log at ERROR level (always shown, critical issues)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, LogLevel::Error.as_str(), message);
}

/// Log at WARNING level (important issues)
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, LogLevel::Warning.as_str(), message);
}

/// Log at INFO level (standard operations)
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, LogLevel::Info.as_str(), message);
}

/// Log at DEBUG level (detailed diagnostics)
///
/// Debug logs are ONLY shown when the matching --debug-<module> flag
/// (or the global --debug flag) is provided.
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, LogLevel::Debug.as_str(), message);
}

/// Log at VERBOSE level (very detailed tracing)
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, LogLevel::Verbose.as_str(), message);
}

/// Force flush all pending log writes
///
/// Call this during shutdown to ensure all logs are written to disk.
pub fn flush() {
    file::flush_file_logging();
}
