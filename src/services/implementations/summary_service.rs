use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::arguments::is_summary_enabled;
use crate::config::Config;
use crate::services::{Service, ServiceHealth};

/// Prints the periodic open-positions table. Only runs with `--summary`.
pub struct SummaryService;

#[async_trait]
impl Service for SummaryService {
    fn name(&self) -> &'static str {
        "summary"
    }

    fn priority(&self) -> i32 {
        150
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["positions"]
    }

    fn is_enabled(&self, config: &Config) -> bool {
        is_summary_enabled() && config.services.is_service_enabled(self.name())
    }

    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
        let handle = tokio::spawn(async move {
            crate::summary::monitor_positions_display(shutdown).await;
        });

        Ok(vec![handle])
    }

    async fn health(&self) -> ServiceHealth {
        ServiceHealth::Healthy
    }
}
