use crate::config_struct;
use crate::marketdata::Timeframe;

// ============================================================================
// MARKET DATA CONFIGURATION
// ============================================================================

config_struct! {
    /// Historical bars and quote retrieval configuration
    pub struct MarketDataConfig {
        /// Bar timeframe for signal detection
        timeframe: Timeframe = Timeframe::M15,

        /// Rolling history window in days
        history_days: i64 = 2,

        /// Bar refresh cadence in seconds
        refresh_interval_secs: u64 = 60,

        /// Cap on data API requests per rolling minute
        max_requests_per_minute: u32 = 180,

        /// Maximum bars kept in memory per symbol
        max_bars_per_symbol: usize = 500,
    }
}
