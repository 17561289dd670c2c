use crate::config_struct;

// ============================================================================
// BROKER CONFIGURATION
// ============================================================================

config_struct! {
    /// Brokerage API configuration
    ///
    /// Credentials may be left empty in the file and provided through the
    /// APCA_API_KEY_ID / APCA_API_SECRET_KEY environment variables instead.
    pub struct BrokerConfig {
        /// Trading API base URL (paper endpoint by default)
        api_base_url: String = "https://paper-api.alpaca.markets".to_string(),

        /// Market data API base URL
        data_base_url: String = "https://data.alpaca.markets".to_string(),

        /// API key id (header APCA-API-KEY-ID)
        api_key_id: String = String::new(),

        /// API secret key (header APCA-API-SECRET-KEY)
        api_secret_key: String = String::new(),

        /// Per-request timeout in seconds
        request_timeout_secs: u64 = 10,

        /// Retry attempts for transient failures (timeouts, 5xx, 429)
        max_retries: u32 = 3,

        /// Base delay for exponential retry backoff in milliseconds
        retry_base_delay_ms: u64 = 250,
    }
}
