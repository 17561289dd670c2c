use std::fmt;

use crate::config::SignalsConfig;
use crate::indicators;
use crate::marketdata::Candle;

/// Direction of a detected reversal.
///
/// `ReversalUp` means a downtrend printed a long lower shadow (buyers
/// stepped in); `ReversalDown` mirrors it at the top of an uptrend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    ReversalUp,
    ReversalDown,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::ReversalUp => "reversal_up",
            Signal::ReversalDown => "reversal_down",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trend {
    Up,
    Down,
}

/// Examine the last three candles for a shadow-reversal pattern.
///
/// The trend comes from the two candles before the latest one. The latest
/// candle must carry a long shadow against that trend, keep a small body
/// relative to its range, and clear the RSI and MA confirmation filters
/// when those are enabled. An indicator whose window is not filled fails
/// its filter rather than passing it.
pub fn detect_reversal(candles: &[Candle], config: &SignalsConfig) -> Option<Signal> {
    if candles.len() < 3 {
        return None;
    }

    let last = &candles[candles.len() - 1];
    let prev = &candles[candles.len() - 2];
    let before_prev = &candles[candles.len() - 3];

    let trend = if prev.close < before_prev.close {
        Trend::Down
    } else {
        Trend::Up
    };

    let body = last.body();
    let range = last.range();
    if range == 0.0 {
        return None;
    }

    let candidate = match trend {
        Trend::Down if last.lower_shadow() > config.shadow_body_ratio * body => Signal::ReversalUp,
        Trend::Up if last.upper_shadow() > config.shadow_body_ratio * body => Signal::ReversalDown,
        _ => return None,
    };

    if body >= config.max_body_range_ratio * range {
        return None;
    }

    let closes = indicators::closes(candles);
    if !rsi_filter_passes(&closes, trend, config) {
        return None;
    }
    if !ma_filter_passes(&closes, last.close, trend, config) {
        return None;
    }

    Some(candidate)
}

fn rsi_filter_passes(closes: &[f64], trend: Trend, config: &SignalsConfig) -> bool {
    if !config.use_rsi {
        return true;
    }
    match indicators::rsi(closes, config.rsi_period) {
        Some(rsi) => match trend {
            Trend::Down => rsi <= config.rsi_oversold,
            Trend::Up => rsi >= config.rsi_overbought,
        },
        None => false,
    }
}

fn ma_filter_passes(closes: &[f64], last_close: f64, trend: Trend, config: &SignalsConfig) -> bool {
    if !config.use_ma {
        return true;
    }
    match indicators::sma(closes, config.ma_period) {
        Some(ma) => match trend {
            Trend::Up => last_close < ma,
            Trend::Down => last_close > ma,
        },
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp: Utc::now(),
            open,
            high,
            low,
            close,
            volume: 1_000.0,
        }
    }

    fn shape_only_config() -> SignalsConfig {
        SignalsConfig {
            use_rsi: false,
            use_ma: false,
            ..SignalsConfig::default()
        }
    }

    #[test]
    fn test_hammer_after_downtrend_signals_up() {
        let candles = vec![
            candle(105.0, 106.0, 104.0, 105.0),
            candle(105.0, 105.5, 99.5, 100.0),
            // Long lower shadow, small body near the top of the range.
            candle(100.0, 101.0, 95.0, 100.5),
        ];
        assert_eq!(
            detect_reversal(&candles, &shape_only_config()),
            Some(Signal::ReversalUp)
        );
    }

    #[test]
    fn test_shooting_star_after_uptrend_signals_down() {
        let candles = vec![
            candle(94.0, 95.5, 93.5, 95.0),
            candle(95.0, 100.5, 94.5, 100.0),
            candle(100.0, 105.0, 99.5, 99.8),
        ];
        assert_eq!(
            detect_reversal(&candles, &shape_only_config()),
            Some(Signal::ReversalDown)
        );
    }

    #[test]
    fn test_shadow_on_wrong_side_of_trend_is_ignored() {
        // Hammer shape, but the two prior closes are rising.
        let candles = vec![
            candle(95.0, 95.5, 94.5, 95.0),
            candle(95.0, 100.5, 94.5, 100.0),
            candle(100.0, 101.0, 95.0, 100.5),
        ];
        assert_eq!(detect_reversal(&candles, &shape_only_config()), None);
    }

    #[test]
    fn test_wide_body_is_rejected() {
        // Shadow clears 2x the body but the body eats too much of the range.
        let candles = vec![
            candle(105.0, 106.0, 104.0, 105.0),
            candle(105.0, 105.5, 99.5, 100.0),
            candle(100.0, 101.05, 97.85, 101.0),
        ];
        assert_eq!(detect_reversal(&candles, &shape_only_config()), None);
    }

    #[test]
    fn test_flat_candle_and_short_history_are_rejected() {
        let flat = vec![
            candle(105.0, 106.0, 104.0, 105.0),
            candle(105.0, 105.5, 99.5, 100.0),
            candle(100.0, 100.0, 100.0, 100.0),
        ];
        assert_eq!(detect_reversal(&flat, &shape_only_config()), None);
        assert_eq!(detect_reversal(&flat[1..], &shape_only_config()), None);
    }

    #[test]
    fn test_unfilled_rsi_window_fails_filter() {
        let config = SignalsConfig {
            use_rsi: true,
            use_ma: false,
            ..SignalsConfig::default()
        };
        // Valid hammer, but five candles cannot fill a 14-period RSI.
        let candles = vec![
            candle(107.0, 108.0, 106.0, 107.0),
            candle(107.0, 107.5, 105.5, 106.0),
            candle(105.0, 106.0, 104.0, 105.0),
            candle(105.0, 105.5, 99.5, 100.0),
            candle(100.0, 101.0, 95.0, 100.5),
        ];
        assert_eq!(detect_reversal(&candles, &config), None);
    }

    #[test]
    fn test_filters_pass_on_confirmed_reversal() {
        let config = SignalsConfig {
            use_rsi: true,
            rsi_period: 3,
            use_ma: true,
            ma_period: 3,
            ..SignalsConfig::default()
        };
        // Falling closes keep RSI(3) oversold; the last close sits just
        // above MA(3) as the downtrend filter requires.
        let candles = vec![
            candle(110.0, 111.0, 109.0, 110.0),
            candle(110.0, 110.5, 107.5, 108.0),
            candle(108.0, 108.5, 105.5, 106.0),
            candle(106.0, 106.5, 104.5, 105.0),
            candle(105.0, 105.5, 103.5, 104.0),
            candle(104.8, 104.9, 104.0, 104.6),
        ];
        assert_eq!(detect_reversal(&candles, &config), Some(Signal::ReversalUp));
    }
}
