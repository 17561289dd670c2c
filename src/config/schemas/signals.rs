use crate::config_struct;

// ============================================================================
// SIGNALS CONFIGURATION
// ============================================================================

config_struct! {
    /// Reversal signal detection configuration
    pub struct SignalsConfig {
        // RSI confirmation filter
        use_rsi: bool = true,
        rsi_period: usize = 14,
        rsi_overbought: f64 = 70.0,
        rsi_oversold: f64 = 30.0,

        // Moving average confirmation filter
        use_ma: bool = true,
        ma_period: usize = 50,

        // Candle shape thresholds
        /// Shadow must exceed this multiple of the candle body
        shadow_body_ratio: f64 = 2.0,
        /// Body must stay under this fraction of the candle range
        max_body_range_ratio: f64 = 0.3,
    }
}
