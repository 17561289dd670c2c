// Config schema submodule - one file per configuration area

use crate::config_struct;

mod broker;
mod market_data;
mod services;
mod signals;
mod trading;
mod watchlist;

pub use broker::*;
pub use market_data::*;
pub use services::*;
pub use signals::*;
pub use trading::*;
pub use watchlist::*;

// ============================================================================
// ROOT CONFIGURATION
// ============================================================================

config_struct! {
    /// Root configuration structure containing all sub-configurations
    pub struct Config {
        /// Brokerage API configuration
        broker: BrokerConfig = BrokerConfig::default(),

        /// Trading configuration
        trading: TradingConfig = TradingConfig::default(),

        /// Signal detection configuration
        signals: SignalsConfig = SignalsConfig::default(),

        /// Market data configuration
        market_data: MarketDataConfig = MarketDataConfig::default(),

        /// Watchlist configuration
        watchlist: WatchlistConfig = WatchlistConfig::default(),

        /// Services configuration
        services: ServicesConfig = ServicesConfig::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();

        assert_eq!(config.trading.quantity, 1.0);
        assert_eq!(config.trading.take_profit_pct, 5.0);
        assert_eq!(config.trading.stop_loss_pct, 3.0);
        assert_eq!(config.trading.max_open_positions, 1);
        assert_eq!(config.trading.watch_interval_secs, 60);
        assert_eq!(config.trading.position_monitor_interval_secs, 10);

        assert!(config.signals.use_rsi);
        assert_eq!(config.signals.rsi_period, 14);
        assert_eq!(config.signals.rsi_overbought, 70.0);
        assert_eq!(config.signals.rsi_oversold, 30.0);
        assert!(config.signals.use_ma);
        assert_eq!(config.signals.ma_period, 50);

        assert_eq!(config.market_data.history_days, 2);
        assert_eq!(config.watchlist.symbols, vec!["SPX".to_string()]);
        assert_eq!(
            config.watchlist.option_roots.get("SPX"),
            Some(&"SPXW".to_string())
        );
    }

    #[test]
    fn test_partial_toml_fills_from_defaults() {
        let toml_str = r#"
            [trading]
            quantity = 2.0

            [signals]
            use_rsi = false
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();

        assert_eq!(config.trading.quantity, 2.0);
        assert!(!config.signals.use_rsi);
        // Untouched fields keep their defaults
        assert_eq!(config.trading.take_profit_pct, 5.0);
        assert_eq!(config.signals.ma_period, 50);
        assert_eq!(
            config.broker.api_base_url,
            "https://paper-api.alpaca.markets"
        );
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(parsed.trading.max_open_positions, config.trading.max_open_positions);
        assert_eq!(parsed.watchlist.symbols, config.watchlist.symbols);
    }
}
