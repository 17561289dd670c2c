/// Log tags identifying the module that produced a message
///
/// Each tag maps to a --debug-<module> command-line flag and a fixed
/// console color (see format.rs).

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Broker,
    MarketData,
    Signals,
    Watchlist,
    Positions,
    Trader,
    Confirm,
    Summary,
    Shutdown,
    Test,
    Other(String),
}

impl LogTag {
    /// Plain uppercase name used in file output (no colors)
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::System => "SYSTEM".to_string(),
            LogTag::Config => "CONFIG".to_string(),
            LogTag::Broker => "BROKER".to_string(),
            LogTag::MarketData => "MARKET".to_string(),
            LogTag::Signals => "SIGNALS".to_string(),
            LogTag::Watchlist => "WATCHLIST".to_string(),
            LogTag::Positions => "POSITIONS".to_string(),
            LogTag::Trader => "TRADER".to_string(),
            LogTag::Confirm => "CONFIRM".to_string(),
            LogTag::Summary => "SUMMARY".to_string(),
            LogTag::Shutdown => "SHUTDOWN".to_string(),
            LogTag::Test => "TEST".to_string(),
            LogTag::Other(s) => s.to_uppercase(),
        }
    }

    /// Key used to match against --debug-<key> flags
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system".to_string(),
            LogTag::Config => "config".to_string(),
            LogTag::Broker => "broker".to_string(),
            LogTag::MarketData => "market-data".to_string(),
            LogTag::Signals => "signals".to_string(),
            LogTag::Watchlist => "watchlist".to_string(),
            LogTag::Positions => "positions".to_string(),
            LogTag::Trader => "trader".to_string(),
            LogTag::Confirm => "confirm".to_string(),
            LogTag::Summary => "summary".to_string(),
            LogTag::Shutdown => "shutdown".to_string(),
            LogTag::Test => "test".to_string(),
            LogTag::Other(s) => s.to_lowercase(),
        }
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_strings_are_uppercase() {
        assert_eq!(LogTag::Broker.to_plain_string(), "BROKER");
        assert_eq!(LogTag::MarketData.to_plain_string(), "MARKET");
        assert_eq!(LogTag::Other("custom".to_string()).to_plain_string(), "CUSTOM");
    }

    #[test]
    fn test_debug_keys_match_flags() {
        assert_eq!(LogTag::MarketData.to_debug_key(), "market-data");
        assert_eq!(LogTag::Confirm.to_debug_key(), "confirm");
    }
}
