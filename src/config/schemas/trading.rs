use crate::config_struct;

// ============================================================================
// TRADING CONFIGURATION
// ============================================================================

config_struct! {
    /// Trading system configuration
    pub struct TradingConfig {
        // Trader control
        enabled: bool = true,

        // Core trading parameters
        quantity: f64 = 1.0,
        take_profit_pct: f64 = 5.0,
        stop_loss_pct: f64 = 3.0,
        max_open_positions: usize = 1,

        // Monitoring intervals
        watch_interval_secs: u64 = 60,
        error_retry_secs: u64 = 30,
        position_monitor_interval_secs: u64 = 10,

        // Fill confirmation deadlines
        entry_confirm_timeout_secs: i64 = 120,
        exit_confirm_timeout_secs: i64 = 180,
    }
}
