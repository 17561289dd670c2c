// Bar retrieval over the broker data API, guarded by a rolling per-minute
// request budget

use super::store::update_bars;
use super::types::Candle;
use crate::broker::{ broker, Bar };
use crate::errors::MarketDataError;
use crate::logger::{ log, LogTag };
use crate::utils::check_shutdown_or_delay;
use chrono::Utc;
use once_cell::sync::Lazy;
use std::collections::VecDeque;
use std::sync::{ Arc, Mutex };
use std::time::{ Duration, Instant };
use tokio::sync::Notify;

const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Bars per request page; the data API caps pages well above our windows
const BARS_PER_PAGE: usize = 10_000;

static REQUEST_HISTORY: Lazy<Mutex<VecDeque<Instant>>> = Lazy::new(|| Mutex::new(VecDeque::new()));

fn prune_history(history: &mut VecDeque<Instant>, now: Instant) {
    while let Some(&front) = history.front() {
        if now.duration_since(front) >= RATE_LIMIT_WINDOW {
            history.pop_front();
        } else {
            break;
        }
    }
}

/// Wait until the rolling 60s window has room, then take a slot
async fn acquire_request_slot() {
    let cap = crate::config::with_config(|cfg| cfg.market_data.max_requests_per_minute) as usize;

    loop {
        let wait = {
            let mut history = REQUEST_HISTORY.lock().unwrap_or_else(|e| e.into_inner());
            let now = Instant::now();
            prune_history(&mut history, now);

            if history.len() < cap {
                history.push_back(now);
                None
            } else {
                // Sleep until the oldest request leaves the window
                history
                    .front()
                    .map(|&front| RATE_LIMIT_WINDOW.saturating_sub(now.duration_since(front)))
            }
        };

        match wait {
            None => {
                return;
            }
            Some(delay) => {
                tokio::time::sleep(delay.max(Duration::from_millis(50))).await;
            }
        }
    }
}

fn bar_to_candle(bar: &Bar) -> Candle {
    Candle {
        timestamp: bar.t,
        open: bar.o,
        high: bar.h,
        low: bar.l,
        close: bar.c,
        volume: bar.v,
    }
}

/// Fetch the configured history window of bars for a symbol.
///
/// Invalid bars from the feed are dropped; an entirely empty response is an
/// error so callers can tell "no data" from "flat market".
pub async fn fetch_history(symbol: &str) -> Result<Vec<Candle>, MarketDataError> {
    let (timeframe, history_days) = crate::config::with_config(|cfg| (
        cfg.market_data.timeframe,
        cfg.market_data.history_days,
    ));

    let end = Utc::now();
    let start = end - chrono::Duration::days(history_days);

    acquire_request_slot().await;

    let bars = broker().fetch_bars(symbol, timeframe, start, end, BARS_PER_PAGE).await?;

    let candles: Vec<Candle> = bars
        .iter()
        .map(bar_to_candle)
        .filter(|c| c.is_valid())
        .collect();

    if candles.is_empty() {
        return Err(MarketDataError::EmptyBars {
            symbol: symbol.to_string(),
            timeframe: timeframe.as_str().to_string(),
        });
    }

    Ok(candles)
}

/// Fetch and merge into the store. Returns the number of bars fetched.
pub async fn refresh_symbol(symbol: &str) -> Result<usize, MarketDataError> {
    let candles = fetch_history(symbol).await?;
    let count = candles.len();
    update_bars(symbol, candles);
    Ok(count)
}

/// Background refresh loop: every `refresh_interval_secs`, re-fetch bars for
/// every watched symbol. Per-symbol failures are logged and skipped so one
/// bad symbol cannot starve the rest.
pub async fn market_data_loop(shutdown: Arc<Notify>) {
    log(LogTag::MarketData, "START", "Market data refresh loop started");

    // Short initial delay so startup logging settles before the first burst
    if check_shutdown_or_delay(&shutdown, Duration::from_secs(1)).await {
        return;
    }

    loop {
        let symbols = crate::watchlist::get_watchlist();

        for symbol in &symbols {
            match refresh_symbol(symbol).await {
                Ok(count) => {
                    crate::logger::debug(
                        LogTag::MarketData,
                        &format!("Refreshed {} bars for {}", count, symbol)
                    );
                }
                Err(e) => {
                    log(
                        LogTag::MarketData,
                        "WARN",
                        &format!("Failed to refresh bars for {}: {}", symbol, e)
                    );
                }
            }
        }

        let interval = crate::config::with_config(|cfg| cfg.market_data.refresh_interval_secs);
        if check_shutdown_or_delay(&shutdown, Duration::from_secs(interval)).await {
            break;
        }
    }

    log(LogTag::MarketData, "STOP", "Market data refresh loop stopped");
}
