use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::logger::{log, LogTag};
use crate::services::{Service, ServiceHealth};

/// Owns position persistence and the order confirmation worker.
///
/// Initialization restores open positions from the database, reconciles the
/// capacity semaphore against them and re-enqueues every order still waiting
/// on a terminal status, so a restart never loses track of working orders.
pub struct PositionsService;

#[async_trait]
impl Service for PositionsService {
    fn name(&self) -> &'static str {
        "positions"
    }

    fn priority(&self) -> i32 {
        60
    }

    async fn initialize(&mut self) -> Result<(), String> {
        crate::positions::initialize_positions()
            .await
            .map_err(|e| format!("Positions init failed: {}", e))
    }

    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
        let handle = tokio::spawn(async move {
            crate::positions::confirmation_worker(shutdown).await;
        });

        log(LogTag::System, "INFO", "Positions service started");

        Ok(vec![handle])
    }

    async fn health(&self) -> ServiceHealth {
        let queued = crate::positions::queue_len().await;
        if queued > 20 {
            ServiceHealth::Degraded(format!("{} confirmations backed up", queued))
        } else {
            ServiceHealth::Healthy
        }
    }
}
