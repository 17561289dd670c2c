use crate::config_struct;
use std::collections::HashMap;

// ============================================================================
// WATCHLIST CONFIGURATION
// ============================================================================

config_struct! {
    /// Watched instruments and options routing
    pub struct WatchlistConfig {
        /// Symbols scanned for reversal signals
        symbols: Vec<String> = vec!["SPX".to_string()],

        /// Symbols traded through the index-options path instead of shares
        option_symbols: Vec<String> = vec!["SPX".to_string()],

        /// Strike rounding increment for option contracts
        option_strike_increment: f64 = 25.0,

        /// Option root overrides (underlying -> root), e.g. SPX -> SPXW weeklies
        option_roots: HashMap<String, String> = HashMap::from([
            ("SPX".to_string(), "SPXW".to_string()),
        ]),
    }
}
