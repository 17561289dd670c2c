// Trading loops: the watchlist scanner that turns reversal signals into
// entries, and the position monitor that walks open positions toward
// their exits. Both run as independent tasks under the trader service.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use crate::{
    arguments::is_debug_trader_enabled,
    broker::broker,
    errors::{BotError, PositionError},
    logger::{log, LogTag},
    marketdata,
    positions::{
        available_open_slots, check_exit_levels, close_position_market, get_open_positions,
        has_open_or_pending, open_position_from_signal, record_price,
    },
    signals::detect_reversal,
    utils::{check_shutdown_or_delay, format_price},
    watchlist::get_watchlist,
};

// =============================================================================
// TRADER CONSTANTS
// =============================================================================

/// A reversal needs at least this many bars before it is worth checking
pub const SIGNAL_MIN_BARS: usize = 3;

// =============================================================================
// WATCHLIST SCANNER
// =============================================================================

/// Scan the watchlist for reversal signals on a fixed cadence.
///
/// A clean cycle sleeps `watch_interval_secs`; a cycle that hits a broker
/// or data problem logs it and backs off `error_retry_secs` instead.
pub async fn monitor_watchlist(shutdown: Arc<Notify>) {
    log(LogTag::Trader, "START", "📡 Watchlist scanner started");

    loop {
        let (interval_secs, error_retry_secs) = crate::config::with_config(|cfg| {
            (
                cfg.trading.watch_interval_secs,
                cfg.trading.error_retry_secs,
            )
        });

        let delay = match scan_watchlist_once().await {
            Ok(()) => Duration::from_secs(interval_secs),
            Err(e) => {
                log(
                    LogTag::Trader,
                    "ERROR",
                    &format!("Scan cycle failed, backing off: {}", e),
                );
                Duration::from_secs(error_retry_secs)
            }
        };

        if check_shutdown_or_delay(&shutdown, delay).await {
            break;
        }
    }

    log(LogTag::Trader, "STOP", "Watchlist scanner stopped");
}

/// One pass over the watchlist. Symbols that cannot trade right now are
/// skipped; infrastructure failures bubble up so the caller can back off.
async fn scan_watchlist_once() -> Result<(), BotError> {
    let symbols = get_watchlist();
    if symbols.is_empty() {
        return Ok(());
    }

    let signals_config = crate::config::with_config(|cfg| cfg.signals.clone());

    for symbol in symbols {
        if available_open_slots() == 0 {
            if is_debug_trader_enabled() {
                log(
                    LogTag::Trader,
                    "DEBUG",
                    "No open slots left, ending scan early",
                );
            }
            break;
        }

        if has_open_or_pending(&symbol).await {
            continue;
        }

        let mut bars = marketdata::get_bars(&symbol);
        if bars.len() < SIGNAL_MIN_BARS {
            // Cold store for this symbol; pull history before judging it
            marketdata::refresh_symbol(&symbol).await?;
            bars = marketdata::get_bars(&symbol);
            if bars.len() < SIGNAL_MIN_BARS {
                continue;
            }
        }

        let Some(signal) = detect_reversal(&bars, &signals_config) else {
            continue;
        };

        log(
            LogTag::Trader,
            "SIGNAL",
            &format!(
                "🎯 {} on {} (close {})",
                signal,
                symbol,
                bars.last().map(|b| format_price(b.close)).unwrap_or_default()
            ),
        );

        match open_position_from_signal(&symbol, signal).await {
            Ok(position) => {
                log(
                    LogTag::Trader,
                    "TRADE",
                    &format!(
                        "Opened {} {} (order {})",
                        position.side,
                        position.display_symbol,
                        position.entry_order_id.as_deref().unwrap_or("?")
                    ),
                );
            }
            Err(
                e @ (PositionError::CapacityExhausted { .. }
                | PositionError::LockBusy { .. }
                | PositionError::PendingEntry { .. }
                | PositionError::AlreadyExiting { .. }),
            ) => {
                if is_debug_trader_enabled() {
                    log(
                        LogTag::Trader,
                        "DEBUG",
                        &format!("Skipped {}: {}", symbol, e),
                    );
                }
            }
            Err(PositionError::NoEntryPrice { symbol }) => {
                log(
                    LogTag::Trader,
                    "WARN",
                    &format!("No usable price for {}, skipping", symbol),
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

// =============================================================================
// POSITION MONITOR
// =============================================================================

/// Walk open positions on a fixed cadence, tracking prices and submitting
/// exits when a protection level is crossed.
pub async fn monitor_open_positions(shutdown: Arc<Notify>) {
    log(LogTag::Trader, "START", "👁️ Position monitor started");

    loop {
        monitor_positions_once().await;

        let interval_secs =
            crate::config::with_config(|cfg| cfg.trading.position_monitor_interval_secs);
        if check_shutdown_or_delay(&shutdown, Duration::from_secs(interval_secs)).await {
            break;
        }
    }

    log(LogTag::Trader, "STOP", "Position monitor stopped");
}

/// One monitoring pass. The snapshot is collected up front so no lock is
/// held across the quote calls.
async fn monitor_positions_once() {
    let to_check: Vec<_> = get_open_positions()
        .await
        .into_iter()
        .filter(|p| p.entry_fill_confirmed && !p.is_exit_pending())
        .collect();

    for position in to_check {
        let quote = match broker().latest_quote(&position.symbol).await {
            Ok(quote) => quote,
            Err(e) => {
                log(
                    LogTag::Trader,
                    "WARN",
                    &format!("Quote for {} failed: {}", position.display_symbol, e),
                );
                continue;
            }
        };

        let Some(price) = quote.price.filter(|p| *p > 0.0) else {
            if is_debug_trader_enabled() {
                log(
                    LogTag::Trader,
                    "DEBUG",
                    &format!("No price for {} this cycle", position.display_symbol),
                );
            }
            continue;
        };

        record_price(&position.position_uuid, price).await;

        let Some(check) = check_exit_levels(&position, price) else {
            continue;
        };

        log(
            LogTag::Trader,
            "EXIT",
            &format!(
                "🎯 {} hit {} at {} (tp {} / sl {}, pnl {:+.2}%)",
                position.display_symbol,
                check.reason(),
                format_price(price),
                format_price(position.take_profit_price),
                format_price(position.stop_loss_price),
                position.unrealized_pnl_pct(price)
            ),
        );

        match close_position_market(&position.position_uuid, check.reason()).await {
            Ok(()) => {}
            Err(
                e @ (PositionError::AlreadyExiting { .. } | PositionError::LockBusy { .. }),
            ) => {
                if is_debug_trader_enabled() {
                    log(
                        LogTag::Trader,
                        "DEBUG",
                        &format!("Exit already handled for {}: {}", position.display_symbol, e),
                    );
                }
            }
            Err(e) => {
                log(
                    LogTag::Trader,
                    "ERROR",
                    &format!("Close for {} failed: {}", position.display_symbol, e),
                );
            }
        }
    }
}
