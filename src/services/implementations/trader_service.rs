use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::logger::{log, LogTag};
use crate::services::{Service, ServiceHealth};

/// Runs the watchlist scanner and the open-position monitor.
pub struct TraderService;

#[async_trait]
impl Service for TraderService {
    fn name(&self) -> &'static str {
        "trader"
    }

    fn priority(&self) -> i32 {
        140
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["market_data", "positions"]
    }

    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
        let shutdown_scan = shutdown.clone();
        let scan_handle = tokio::spawn(async move {
            crate::trader::monitor_watchlist(shutdown_scan).await;
        });

        let shutdown_monitor = shutdown.clone();
        let monitor_handle = tokio::spawn(async move {
            crate::trader::monitor_open_positions(shutdown_monitor).await;
        });

        log(LogTag::System, "INFO", "Trader service started");

        Ok(vec![scan_handle, monitor_handle])
    }

    async fn health(&self) -> ServiceHealth {
        ServiceHealth::Healthy
    }
}
