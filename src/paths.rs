//! Centralized path resolution for ReversalBot
//!
//! All file and directory paths are resolved through this module to ensure consistent
//! behavior across platforms.
//!
//! ## Path Strategy
//!
//! - **macOS**: `~/Library/Application Support/ReversalBot/`
//! - **Windows**: `%LOCALAPPDATA%\ReversalBot\`
//! - **Linux**: `$XDG_DATA_HOME/ReversalBot/` (fallback `~/.local/share/ReversalBot/`)
//!
//! ## Directory Structure
//!
//! ```text
//! ~/ReversalBot/
//! ├── data/
//! │ ├── config.toml
//! │ ├── positions.db
//! │ └── watchlist.json
//! └── logs/
//!   └── reversalbot-*.log
//! ```

use once_cell::sync::Lazy;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

// =============================================================================
// BASE DIRECTORY RESOLUTION
// =============================================================================

/// Tracks whether initialization logging has been done
static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Lazy-initialized base directory (thread-safe)
static BASE_DIRECTORY: Lazy<PathBuf> = Lazy::new(|| {
  let base_dir = resolve_base_directory();
  INITIALIZED.store(true, Ordering::SeqCst);
  base_dir
});

/// Resolves the base directory for all ReversalBot data
///
/// Uses platform-specific application data locations:
/// - macOS: ~/Library/Application Support/ReversalBot
/// - Windows: %LOCALAPPDATA%\ReversalBot
/// - Linux: $XDG_DATA_HOME/ReversalBot (fallback ~/.local/share/ReversalBot)
fn resolve_base_directory() -> PathBuf {
  const APP_DIR: &str = "ReversalBot";

  if let Some(dir) = dirs::data_local_dir() {
    return dir.join(APP_DIR);
  }

  if let Some(dir) = dirs::data_dir() {
    return dir.join(APP_DIR);
  }

  if let Some(home) = dirs::home_dir() {
    return home.join(APP_DIR);
  }

  PathBuf::from(APP_DIR)
}

// =============================================================================
// PRIMARY DIRECTORY ACCESSORS
// =============================================================================

/// Returns the base directory for all ReversalBot data
pub fn get_base_directory() -> PathBuf {
  BASE_DIRECTORY.clone()
}

/// Returns the data directory path
///
/// Contains the database, config file, and the persisted watchlist.
pub fn get_data_directory() -> PathBuf {
  BASE_DIRECTORY.join("data")
}

/// Returns the logs directory path
///
/// Contains daily log files.
pub fn get_logs_directory() -> PathBuf {
  BASE_DIRECTORY.join("logs")
}

// =============================================================================
// FILE PATHS
// =============================================================================

/// Returns the main configuration file path
pub fn get_config_path() -> PathBuf {
  get_data_directory().join("config.toml")
}

/// Returns the positions database path
pub fn get_positions_db_path() -> PathBuf {
  get_data_directory().join("positions.db")
}

/// Returns the persisted watchlist file path
pub fn get_watchlist_path() -> PathBuf {
  get_data_directory().join("watchlist.json")
}

// =============================================================================
// DIRECTORY CREATION
// =============================================================================

/// Ensures all required directories exist
///
/// Creates the base directory and all subdirectories needed for operation.
/// This should be called early in the application startup.
///
/// ## Returns
///
/// - `Ok(())` if all directories exist or were created successfully
/// - `Err(String)` if any directory creation failed
pub fn ensure_all_directories() -> Result<(), String> {
  if !is_initialized() {
    eprintln!("Base directory: {}", get_base_directory().display());
  }

  let dirs_to_create = vec![
    ("base", get_base_directory()),
    ("data", get_data_directory()),
    ("logs", get_logs_directory()),
  ];

  for (name, dir) in dirs_to_create {
    if !dir.exists() {
      std::fs::create_dir_all(&dir).map_err(|e| {
        format!(
          "Failed to create {} directory at {}: {}",
          name,
          dir.display(),
          e
        )
      })?;

      eprintln!("Created directory: {}", dir.display());
    }
  }

  Ok(())
}

// =============================================================================
// UTILITY FUNCTIONS
// =============================================================================

/// Returns a display string for the base directory (for user-facing messages)
pub fn get_base_directory_display() -> String {
  BASE_DIRECTORY.display().to_string()
}

/// Checks if the base directory has been initialized
pub fn is_initialized() -> bool {
  INITIALIZED.load(Ordering::SeqCst)
}

// =============================================================================
// TESTS
// =============================================================================
