use crate::config_struct;

// ============================================================================
// SERVICES CONFIGURATION
// ============================================================================

config_struct! {
    /// Individual service configuration
    pub struct ServiceConfig {
        enabled: bool = true,
    }
}

config_struct! {
    /// Services configuration
    pub struct ServicesConfig {
        market_data: ServiceConfig = ServiceConfig { enabled: true },
        positions: ServiceConfig = ServiceConfig { enabled: true },
        trader: ServiceConfig = ServiceConfig { enabled: true },
        summary: ServiceConfig = ServiceConfig { enabled: true },
    }
}

impl ServicesConfig {
    /// Look up a service toggle by its registered name
    pub fn is_service_enabled(&self, name: &str) -> bool {
        match name {
            "market_data" => self.market_data.enabled,
            "positions" => self.positions.enabled,
            "trader" => self.trader.enabled,
            "summary" => self.summary.enabled,
            _ => true,
        }
    }
}
