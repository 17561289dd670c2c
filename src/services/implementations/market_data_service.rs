use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::logger::{log, LogTag};
use crate::services::{Service, ServiceHealth};

/// Keeps the bar store fresh for every watched symbol.
pub struct MarketDataService;

#[async_trait]
impl Service for MarketDataService {
    fn name(&self) -> &'static str {
        "market_data"
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
        let handle = tokio::spawn(async move {
            crate::marketdata::market_data_loop(shutdown).await;
        });

        log(LogTag::System, "INFO", "Market data service started");

        Ok(vec![handle])
    }

    async fn health(&self) -> ServiceHealth {
        // Stale bars on any watched symbol degrade the service but do not
        // fail it; the fetch loop retries on its own.
        let stale_after = crate::config::with_config(|cfg| {
            cfg.market_data.refresh_interval_secs.saturating_mul(5) as i64
        });

        for symbol in crate::watchlist::get_watchlist() {
            if let Some(age) = crate::marketdata::bars_age_secs(&symbol) {
                if age > stale_after {
                    return ServiceHealth::Degraded(format!("{} bars {}s stale", symbol, age));
                }
            }
        }

        ServiceHealth::Healthy
    }
}
