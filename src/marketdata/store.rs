// In-memory bar store shared by the fetcher, the scanner and the monitor

use super::types::Candle;
use chrono::Utc;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::RwLock;

/// Bars per symbol, strictly ascending by timestamp
pub static BARS: Lazy<RwLock<HashMap<String, Vec<Candle>>>> = Lazy::new(||
    RwLock::new(HashMap::new())
);

/// Merge freshly fetched candles into the store for a symbol.
///
/// The merged series is sorted by timestamp, deduped on timestamp (newest
/// fetch wins) and capped to the configured history length.
pub fn update_bars(symbol: &str, candles: Vec<Candle>) {
    let max_len = crate::config::with_config(|cfg| cfg.market_data.max_bars_per_symbol);

    let mut store = match BARS.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    let series = store.entry(symbol.to_string()).or_default();

    // Incoming bars replace stored bars that share a timestamp
    series.retain(|existing| !candles.iter().any(|c| c.timestamp == existing.timestamp));
    series.extend(candles);
    series.sort_by_key(|c| c.timestamp);
    series.dedup_by_key(|c| c.timestamp);

    if series.len() > max_len {
        let excess = series.len() - max_len;
        series.drain(0..excess);
    }
}

/// Snapshot of the stored bars for a symbol
pub fn get_bars(symbol: &str) -> Vec<Candle> {
    match BARS.read() {
        Ok(store) => store.get(symbol).cloned().unwrap_or_default(),
        Err(poisoned) => poisoned.into_inner().get(symbol).cloned().unwrap_or_default(),
    }
}

/// Close of the most recent stored bar
pub fn latest_close(symbol: &str) -> Option<f64> {
    match BARS.read() {
        Ok(store) => store.get(symbol).and_then(|s| s.last()).map(|c| c.close),
        Err(poisoned) => {
            poisoned
                .into_inner()
                .get(symbol)
                .and_then(|s| s.last())
                .map(|c| c.close)
        }
    }
}

/// Seconds since the most recent stored bar, None when nothing is stored
pub fn bars_age_secs(symbol: &str) -> Option<i64> {
    let last_ts = match BARS.read() {
        Ok(store) => store.get(symbol).and_then(|s| s.last()).map(|c| c.timestamp),
        Err(poisoned) => {
            poisoned
                .into_inner()
                .get(symbol)
                .and_then(|s| s.last())
                .map(|c| c.timestamp)
        }
    }?;

    Some((Utc::now() - last_ts).num_seconds())
}
