//! Runtime watchlist of symbols scanned for signals.
//!
//! Seeded from `config.watchlist.symbols` and unioned with the persisted
//! `watchlist.json`, so symbols added at runtime survive restarts. The set
//! is kept sorted and uppercased.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::config::with_config;
use crate::logger::{self, log, LogTag};
use crate::paths::get_watchlist_path;

static WATCHLIST: Lazy<RwLock<BTreeSet<String>>> = Lazy::new(|| RwLock::new(BTreeSet::new()));

/// Seed the watchlist from config plus the persisted file.
pub fn init_watchlist() {
    let configured: Vec<String> = with_config(|config| config.watchlist.symbols.clone());
    let saved = load_symbols_from(&get_watchlist_path());

    let mut watchlist = WATCHLIST
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    for symbol in configured.iter().chain(saved.iter()) {
        watchlist.insert(symbol.trim().to_uppercase());
    }
    watchlist.retain(|symbol| !symbol.is_empty());

    log(
        LogTag::Watchlist,
        "INIT",
        &format!(
            "Watching {} symbol(s): {}",
            watchlist.len(),
            watchlist.iter().cloned().collect::<Vec<_>>().join(", ")
        ),
    );
}

/// Current symbols, sorted.
pub fn get_watchlist() -> Vec<String> {
    WATCHLIST
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .iter()
        .cloned()
        .collect()
}

/// Add a symbol. Returns false when it was already watched.
pub fn add_symbol(symbol: &str) -> bool {
    let normalized = symbol.trim().to_uppercase();
    if normalized.is_empty() {
        return false;
    }

    let inserted = WATCHLIST
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .insert(normalized.clone());

    if inserted {
        log(LogTag::Watchlist, "ADD", &format!("Now watching {}", normalized));
        if let Err(e) = save_watchlist() {
            logger::warning(LogTag::Watchlist, &format!("Failed to persist watchlist: {}", e));
        }
    }
    inserted
}

/// Remove a symbol. Returns false when it was not watched.
pub fn remove_symbol(symbol: &str) -> bool {
    let normalized = symbol.trim().to_uppercase();
    let removed = WATCHLIST
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .remove(&normalized);

    if removed {
        log(LogTag::Watchlist, "REMOVE", &format!("Stopped watching {}", normalized));
        if let Err(e) = save_watchlist() {
            logger::warning(LogTag::Watchlist, &format!("Failed to persist watchlist: {}", e));
        }
    }
    removed
}

/// Write the current set to `watchlist.json` in the data directory.
pub fn save_watchlist() -> Result<(), String> {
    let symbols = get_watchlist();
    save_symbols_to(&get_watchlist_path(), &symbols)
}

/// True when the symbol trades through the index-options path.
pub fn is_option_symbol(symbol: &str) -> bool {
    with_config(|config| {
        config
            .watchlist
            .option_symbols
            .iter()
            .any(|s| s.eq_ignore_ascii_case(symbol))
    })
}

fn load_symbols_from(path: &Path) -> Vec<String> {
    if !path.exists() {
        return Vec::new();
    }
    match std::fs::read_to_string(path) {
        Ok(data) => match serde_json::from_str::<Vec<String>>(&data) {
            Ok(symbols) => symbols,
            Err(e) => {
                logger::warning(
                    LogTag::Watchlist,
                    &format!("Ignoring malformed {}: {}", path.display(), e),
                );
                Vec::new()
            }
        },
        Err(e) => {
            logger::warning(
                LogTag::Watchlist,
                &format!("Failed to read {}: {}", path.display(), e),
            );
            Vec::new()
        }
    }
}

fn save_symbols_to(path: &Path, symbols: &[String]) -> Result<(), String> {
    let data = serde_json::to_string_pretty(symbols)
        .map_err(|e| format!("Failed to serialize watchlist: {}", e))?;
    std::fs::write(path, data)
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{init_config_with, Config};

    #[test]
    fn test_add_and_remove_normalize_symbols() {
        init_config_with(Config::default());

        assert!(add_symbol(" wl_test_aapl "));
        assert!(!add_symbol("WL_TEST_AAPL"));
        assert!(get_watchlist().contains(&"WL_TEST_AAPL".to_string()));

        assert!(remove_symbol("wl_test_aapl"));
        assert!(!remove_symbol("WL_TEST_AAPL"));
        assert!(!get_watchlist().contains(&"WL_TEST_AAPL".to_string()));

        assert!(!add_symbol("   "));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchlist.json");

        let symbols = vec!["QQQ".to_string(), "SPX".to_string()];
        save_symbols_to(&path, &symbols).unwrap();
        assert_eq!(load_symbols_from(&path), symbols);
    }

    #[test]
    fn test_load_missing_or_malformed_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(load_symbols_from(&missing).is_empty());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        assert!(load_symbols_from(&bad).is_empty());
    }

    #[test]
    fn test_option_symbol_lookup_ignores_case() {
        init_config_with(Config::default());
        assert!(is_option_symbol("SPX"));
        assert!(is_option_symbol("spx"));
        assert!(!is_option_symbol("AAPL"));
    }
}
