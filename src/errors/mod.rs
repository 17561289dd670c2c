/// Structured error types for ReversalBot
///
/// One enum per subsystem plus a top-level wrapper. Errors carry enough
/// context to log a useful line without chasing the call site.

// =============================================================================
// MAIN ERROR TYPE
// =============================================================================

#[derive(Debug, Clone)]
pub enum BotError {
    // Brokerage API errors
    Broker(BrokerError),

    // Market data retrieval errors
    MarketData(MarketDataError),

    // Configuration errors
    Configuration(ConfigurationError),

    // Position management errors
    Position(PositionError),
}

impl std::fmt::Display for BotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BotError::Broker(e) => write!(f, "Broker Error: {}", e),
            BotError::MarketData(e) => write!(f, "Market Data Error: {}", e),
            BotError::Configuration(e) => write!(f, "Configuration Error: {}", e),
            BotError::Position(e) => write!(f, "Position Error: {}", e),
        }
    }
}

impl std::error::Error for BotError {}

// =============================================================================
// BROKER ERROR TYPES
// =============================================================================

#[derive(Debug, Clone)]
pub enum BrokerError {
    ConnectionTimeout {
        endpoint: String,
        timeout_ms: u64,
    },
    Http {
        endpoint: String,
        error: String,
    },
    Auth {
        message: String,
    },
    RateLimited {
        retry_after_secs: Option<u64>,
    },
    Api {
        status: u16,
        message: String,
    },
    Decode {
        endpoint: String,
        error: String,
    },
    OrderRejected {
        symbol: String,
        reason: String,
    },
}

impl BrokerError {
    /// Whether retrying the same request may succeed
    ///
    /// Timeouts, transport failures, throttling and 5xx responses are
    /// transient. Auth failures, 4xx API errors, rejections and decode
    /// failures are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            BrokerError::ConnectionTimeout { .. } => true,
            BrokerError::Http { .. } => true,
            BrokerError::RateLimited { .. } => true,
            BrokerError::Api { status, .. } => *status >= 500,
            BrokerError::Auth { .. } => false,
            BrokerError::Decode { .. } => false,
            BrokerError::OrderRejected { .. } => false,
        }
    }
}

impl std::fmt::Display for BrokerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrokerError::ConnectionTimeout {
                endpoint,
                timeout_ms,
            } => {
                write!(
                    f,
                    "Connection timeout to {} after {}ms",
                    endpoint, timeout_ms
                )
            }
            BrokerError::Http { endpoint, error } => {
                write!(f, "HTTP request to {} failed: {}", endpoint, error)
            }
            BrokerError::Auth { message } => write!(f, "Authentication failed: {}", message),
            BrokerError::RateLimited { retry_after_secs } => match retry_after_secs {
                Some(secs) => write!(f, "Rate limited, retry after {}s", secs),
                None => write!(f, "Rate limited"),
            },
            BrokerError::Api { status, message } => {
                write!(f, "API error {}: {}", status, message)
            }
            BrokerError::Decode { endpoint, error } => {
                write!(f, "Failed to decode response from {}: {}", endpoint, error)
            }
            BrokerError::OrderRejected { symbol, reason } => {
                write!(f, "Order rejected for {}: {}", symbol, reason)
            }
        }
    }
}

impl std::error::Error for BrokerError {}

// =============================================================================
// MARKET DATA ERROR TYPES
// =============================================================================

#[derive(Debug, Clone)]
pub enum MarketDataError {
    Broker(BrokerError),
    EmptyBars {
        symbol: String,
        timeframe: String,
    },
    InsufficientHistory {
        symbol: String,
        have: usize,
        need: usize,
    },
    NoQuote {
        symbol: String,
    },
}

impl std::fmt::Display for MarketDataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketDataError::Broker(e) => write!(f, "{}", e),
            MarketDataError::EmptyBars { symbol, timeframe } => {
                write!(f, "No {} bars returned for {}", timeframe, symbol)
            }
            MarketDataError::InsufficientHistory { symbol, have, need } => {
                write!(
                    f,
                    "Insufficient history for {}: {} bars, need {}",
                    symbol, have, need
                )
            }
            MarketDataError::NoQuote { symbol } => {
                write!(f, "No usable quote for {}", symbol)
            }
        }
    }
}

impl std::error::Error for MarketDataError {}

// =============================================================================
// CONFIGURATION ERROR TYPES
// =============================================================================

#[derive(Debug, Clone)]
pub enum ConfigurationError {
    Io { path: String, error: String },
    Parse { path: String, error: String },
    MissingCredentials,
    InvalidUrl { url: String, error: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigurationError::Io { path, error } => {
                write!(f, "Failed to read config file '{}': {}", path, error)
            }
            ConfigurationError::Parse { path, error } => {
                write!(f, "Failed to parse config file '{}': {}", path, error)
            }
            ConfigurationError::MissingCredentials => {
                write!(
                    f,
                    "Broker credentials missing: set broker.api_key_id/api_secret_key \
                     or the APCA_API_KEY_ID/APCA_API_SECRET_KEY environment variables"
                )
            }
            ConfigurationError::InvalidUrl { url, error } => {
                write!(f, "Invalid URL '{}': {}", url, error)
            }
            ConfigurationError::InvalidValue { field, reason } => {
                write!(f, "Invalid config field '{}': {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

// =============================================================================
// POSITION ERROR TYPES
// =============================================================================

#[derive(Debug, Clone)]
pub enum PositionError {
    NotFound {
        position_uuid: String,
    },
    CapacityExhausted {
        max_open: usize,
    },
    LockBusy {
        symbol: String,
    },
    AlreadyExiting {
        symbol: String,
    },
    PendingEntry {
        symbol: String,
    },
    Database(String),
    Broker(BrokerError),
    NoEntryPrice {
        symbol: String,
    },
}

impl std::fmt::Display for PositionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionError::NotFound { position_uuid } => {
                write!(f, "Position not found: {}", position_uuid)
            }
            PositionError::CapacityExhausted { max_open } => {
                write!(f, "Max open positions reached ({})", max_open)
            }
            PositionError::LockBusy { symbol } => {
                write!(f, "Position lock busy for {}", symbol)
            }
            PositionError::AlreadyExiting { symbol } => {
                write!(f, "Exit already in flight for {}", symbol)
            }
            PositionError::PendingEntry { symbol } => {
                write!(f, "Entry already pending for {}", symbol)
            }
            PositionError::Database(msg) => write!(f, "Database error: {}", msg),
            PositionError::Broker(e) => write!(f, "{}", e),
            PositionError::NoEntryPrice { symbol } => {
                write!(f, "No usable entry price for {}", symbol)
            }
        }
    }
}

impl std::error::Error for PositionError {}

// =============================================================================
// ERROR CONVERSIONS
// =============================================================================

impl From<BrokerError> for BotError {
    fn from(err: BrokerError) -> Self {
        BotError::Broker(err)
    }
}

impl From<MarketDataError> for BotError {
    fn from(err: MarketDataError) -> Self {
        BotError::MarketData(err)
    }
}

impl From<ConfigurationError> for BotError {
    fn from(err: ConfigurationError) -> Self {
        BotError::Configuration(err)
    }
}

impl From<PositionError> for BotError {
    fn from(err: PositionError) -> Self {
        BotError::Position(err)
    }
}

impl From<BrokerError> for MarketDataError {
    fn from(err: BrokerError) -> Self {
        MarketDataError::Broker(err)
    }
}

impl From<BrokerError> for PositionError {
    fn from(err: BrokerError) -> Self {
        PositionError::Broker(err)
    }
}
