// Bot lifecycle: bring the stack up, run until a shutdown is requested,
// then stop services in reverse order.

use crate::{
    global,
    logger::{self, LogTag},
    services::{
        implementations::{MarketDataService, PositionsService, SummaryService, TraderService},
        ServiceManager,
    },
};

/// Main bot execution function - full lifecycle around the ServiceManager
pub async fn run_bot() -> Result<(), String> {
    // Touch the startup clock so uptime counts from here
    let started_at = *global::STARTUP_TIME;

    // 1. Install signal handlers before anything long-running starts
    crate::shutdown::install_shutdown_handlers()?;

    // 2. Broker client; probe credentials only when the trader will act
    crate::broker::init_broker().map_err(|e| format!("Broker init failed: {}", e))?;

    let trading_enabled = crate::config::with_config(|cfg| cfg.trading.enabled);
    if trading_enabled {
        crate::broker::verify_credentials()
            .await
            .map_err(|e| format!("Broker credential check failed: {}", e))?;
    } else {
        logger::info(
            LogTag::System,
            "Trading disabled in config - orders will not be placed",
        );
    }

    // 3. Watchlist from config plus the persisted file
    crate::watchlist::init_watchlist();

    // 4. Service manager with every service registered; disabled ones are
    // filtered inside start_all
    let config = crate::config::get_config_clone();
    let mut service_manager = ServiceManager::new(config);

    service_manager.register(Box::new(MarketDataService));
    service_manager.register(Box::new(PositionsService));
    service_manager.register(Box::new(TraderService));
    service_manager.register(Box::new(SummaryService));

    service_manager.start_all().await?;

    logger::info(LogTag::System, "All services started - bot is running");

    // 5. Park until Ctrl+C / SIGTERM
    crate::shutdown::wait_for_shutdown().await;

    // 6. Reverse-order stop with join timeouts
    logger::info(LogTag::System, "Initiating graceful shutdown...");
    service_manager.stop_all().await?;

    // 7. Final one-line account of the session
    let open = crate::positions::open_position_count().await;
    logger::info(
        LogTag::System,
        &format!(
            "Session over after {} - {} position(s) still open",
            crate::utils::format_duration_compact(started_at, chrono::Utc::now()),
            open
        ),
    );

    logger::flush();

    Ok(())
}
