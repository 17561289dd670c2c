/// Centralized argument handling system for ReversalBot
///
/// This module consolidates all command-line argument parsing and debug flag
/// checking functionality.
///
/// Features:
/// - Centralized CMD_ARGS storage with thread-safe access
/// - Debug flag checking functions for all modules
/// - Unified argument parsing utilities
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
/// Thread-safe singleton that stores arguments for access throughout the application
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Sets the global command-line arguments
/// Used by tests to override the default env::args() collection
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments
/// Returns a vector clone to avoid holding the mutex lock
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => {
            // Fallback to env::args if mutex is poisoned
            env::args().collect()
        }
    }
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args()
        .iter()
        .any(|a| a == arg)
}

/// Gets the value of a command-line argument that follows a flag
/// Returns None if the flag is not found or has no value
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    for (i, arg) in args.iter().enumerate() {
        if arg == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

// =============================================================================
// DEBUG FLAG CHECKING FUNCTIONS
// These functions check for specific debug flags in the command-line arguments
// =============================================================================

/// Global debug mode - enables debug output from every module
pub fn is_debug_enabled() -> bool {
    has_arg("--debug")
}

/// Broker API calls debug mode
pub fn is_debug_broker_enabled() -> bool {
    has_arg("--debug-broker") || is_debug_enabled()
}

/// Market data / bars debug mode
pub fn is_debug_market_data_enabled() -> bool {
    has_arg("--debug-market-data") || is_debug_enabled()
}

/// Signal detection debug mode
pub fn is_debug_signals_enabled() -> bool {
    has_arg("--debug-signals") || is_debug_enabled()
}

/// Trader module debug mode
pub fn is_debug_trader_enabled() -> bool {
    has_arg("--debug-trader") || is_debug_enabled()
}

/// Positions module debug mode
pub fn is_debug_positions_enabled() -> bool {
    has_arg("--debug-positions") || is_debug_enabled()
}

/// Fill confirmation queue debug mode
pub fn is_debug_confirm_enabled() -> bool {
    has_arg("--debug-confirm") || is_debug_enabled()
}

/// Watchlist module debug mode
pub fn is_debug_watchlist_enabled() -> bool {
    has_arg("--debug-watchlist") || is_debug_enabled()
}

/// System operations debug mode
pub fn is_debug_system_enabled() -> bool {
    has_arg("--debug-system") || is_debug_enabled()
}

/// Summary mode - enables console output from summary module
pub fn is_summary_enabled() -> bool {
    has_arg("--summary")
}

/// Paper mode override - forces the paper trading endpoint regardless of config
pub fn is_paper_forced() -> bool {
    has_arg("--paper")
}

/// Custom config file path (`--config <path>`)
pub fn get_config_path_arg() -> Option<String> {
    get_arg_value("--config")
}

// =============================================================================
// HELP SYSTEM
// =============================================================================

/// Displays the help menu with all available flags and their descriptions
pub fn print_help() {
    println!("ReversalBot - Candle Reversal Trading Bot");
    println!();
    println!("USAGE:");
    println!("    reversalbot [FLAGS]");
    println!();
    println!("CORE FLAGS:");
    println!("    --config <path>           Use a custom config file path");
    println!("    --paper                   Force the paper trading endpoint");
    println!("    --summary                 Enable console output from summary module");
    println!("    --help, -h                Show this help message");
    println!();
    println!("DEBUG FLAGS:");
    println!("    --debug                   Enable debug output from all modules");
    println!("    --debug-broker            Broker API calls debug mode");
    println!("    --debug-confirm           Fill confirmation queue debug mode");
    println!("    --debug-market-data       Market data / bars debug mode");
    println!("    --debug-positions         Positions module debug mode");
    println!("    --debug-signals           Signal detection debug mode");
    println!("    --debug-system            System operations debug mode");
    println!("    --debug-trader            Trader module debug mode");
    println!("    --debug-watchlist         Watchlist module debug mode");
    println!();
    println!("EXAMPLES:");
    println!("    reversalbot                              # Start with defaults");
    println!("    reversalbot --summary                    # Start with console summary");
    println!("    reversalbot --paper --debug-trader       # Paper endpoint, trader debug");
    println!("    reversalbot --config my-config.toml      # Custom config file");
}

// =============================================================================
// UTILITY FUNCTIONS
// =============================================================================

/// Checks if any debug mode is enabled
pub fn is_any_debug_enabled() -> bool {
    is_debug_enabled() ||
        is_debug_broker_enabled() ||
        is_debug_market_data_enabled() ||
        is_debug_signals_enabled() ||
        is_debug_trader_enabled() ||
        is_debug_positions_enabled() ||
        is_debug_confirm_enabled() ||
        is_debug_watchlist_enabled() ||
        is_debug_system_enabled()
}

/// Gets a list of all enabled debug modes
pub fn get_enabled_debug_modes() -> Vec<&'static str> {
    let mut modes = Vec::new();

    if is_debug_broker_enabled() {
        modes.push("broker");
    }
    if is_debug_market_data_enabled() {
        modes.push("market-data");
    }
    if is_debug_signals_enabled() {
        modes.push("signals");
    }
    if is_debug_trader_enabled() {
        modes.push("trader");
    }
    if is_debug_positions_enabled() {
        modes.push("positions");
    }
    if is_debug_confirm_enabled() {
        modes.push("confirm");
    }
    if is_debug_watchlist_enabled() {
        modes.push("watchlist");
    }
    if is_debug_system_enabled() {
        modes.push("system");
    }
    if is_summary_enabled() {
        modes.push("summary");
    }
    if is_paper_forced() {
        modes.push("paper");
    }

    modes
}

/// Checks for help flags
pub fn is_help_requested() -> bool {
    has_arg("--help") || has_arg("-h")
}
