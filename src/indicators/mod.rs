/// Technical indicator math over closing-price slices.
///
/// Every function returns `None` until its window is filled, so callers
/// treat "not enough history" and "no reading" the same way.
use crate::marketdata::Candle;

const MACD_FAST_PERIOD: usize = 12;
const MACD_SLOW_PERIOD: usize = 26;
const MACD_SIGNAL_PERIOD: usize = 9;

/// Extract closing prices from a candle series, oldest first.
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// Simple moving average of the last `period` values.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Rolling-mean RSI over the last `period` deltas.
///
/// Plain rolling averages of gains and losses (not Wilder smoothing),
/// so it needs `period + 1` values. A window with no losing bars reads
/// fully overbought (100.0).
pub fn rsi(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period + 1 {
        return None;
    }
    let window = &values[values.len() - (period + 1)..];
    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;
    for pair in window.windows(2) {
        let delta = pair[1] - pair[0];
        if delta > 0.0 {
            gain_sum += delta;
        } else {
            loss_sum -= delta;
        }
    }
    let avg_loss = loss_sum / period as f64;
    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let avg_gain = gain_sum / period as f64;
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// Exponential moving average, `alpha = 2 / (period + 1)`, seeded with
/// the first value.
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    ema_series(values, period).last().copied()
}

/// MACD line, signal line, and histogram for the standard 12/26/9 setup.
///
/// EMAs run from the start of the series, so the slow period is the only
/// length gate.
pub fn macd(values: &[f64]) -> Option<(f64, f64, f64)> {
    if values.len() < MACD_SLOW_PERIOD {
        return None;
    }
    let fast = ema_series(values, MACD_FAST_PERIOD);
    let slow = ema_series(values, MACD_SLOW_PERIOD);
    let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ema_series(&line, MACD_SIGNAL_PERIOD);
    let macd_last = *line.last()?;
    let signal_last = *signal.last()?;
    Some((macd_last, signal_last, macd_last - signal_last))
}

/// Bollinger bands as `(lower, middle, upper)`.
///
/// Middle is the SMA of the window; bands sit `num_std` sample standard
/// deviations away. Sample std needs at least two values in the window.
pub fn bollinger(values: &[f64], period: usize, num_std: f64) -> Option<(f64, f64, f64)> {
    if period < 2 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    let middle = window.iter().sum::<f64>() / period as f64;
    let variance =
        window.iter().map(|v| (v - middle).powi(2)).sum::<f64>() / (period - 1) as f64;
    let band = num_std * variance.sqrt();
    Some((middle - band, middle, middle + band))
}

fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if values.is_empty() || period == 0 {
        return Vec::new();
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut series = Vec::with_capacity(values.len());
    let mut current = values[0];
    series.push(current);
    for &value in &values[1..] {
        current = alpha * value + (1.0 - alpha) * current;
        series.push(current);
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma_last_window() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(sma(&values, 3), Some(4.0));
        assert_eq!(sma(&values, 5), Some(3.0));
        assert_eq!(sma(&values, 6), None);
        assert_eq!(sma(&values, 0), None);
    }

    #[test]
    fn test_rsi_mixed_window() {
        // Deltas: +0.5, -0.5, +1.0, +1.0 -> avg gain 0.625, avg loss 0.125,
        // rs = 5, rsi = 100 - 100/6.
        let values = [44.0, 44.5, 44.0, 45.0, 46.0];
        let rsi = rsi(&values, 4).unwrap();
        assert!((rsi - 83.3333).abs() < 1e-3);
    }

    #[test]
    fn test_rsi_extremes() {
        let rising = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(rsi(&rising, 4), Some(100.0));

        let falling = [5.0, 4.0, 3.0, 2.0, 1.0];
        assert_eq!(rsi(&falling, 4), Some(0.0));

        // Needs period + 1 closes.
        assert_eq!(rsi(&rising[..4], 4), None);
    }

    #[test]
    fn test_ema_recursion() {
        // alpha = 2/3: 1, then 5/3, then 23/9.
        let values = [1.0, 2.0, 3.0];
        let ema = ema(&values, 2).unwrap();
        assert!((ema - 23.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_ema_constant_series() {
        let values = [5.0; 10];
        assert_eq!(ema(&values, 4), Some(5.0));
        assert_eq!(ema(&values[..3], 4), None);
    }

    #[test]
    fn test_macd_flat_series_is_zero() {
        let values = [100.0; 26];
        let (line, signal, histogram) = macd(&values).unwrap();
        assert!(line.abs() < 1e-12);
        assert!(signal.abs() < 1e-12);
        assert!(histogram.abs() < 1e-12);

        assert_eq!(macd(&values[..25]), None);
    }

    #[test]
    fn test_bollinger_sample_std() {
        // Mean 3, sample variance 2.5, band = 2 * sqrt(2.5).
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let (lower, middle, upper) = bollinger(&values, 5, 2.0).unwrap();
        let band = 2.0 * 2.5_f64.sqrt();
        assert!((middle - 3.0).abs() < 1e-12);
        assert!((upper - (3.0 + band)).abs() < 1e-12);
        assert!((lower - (3.0 - band)).abs() < 1e-12);
    }

    #[test]
    fn test_bollinger_degenerate_windows() {
        let flat = [10.0; 20];
        let (lower, middle, upper) = bollinger(&flat, 20, 2.0).unwrap();
        assert_eq!((lower, middle, upper), (10.0, 10.0, 10.0));

        // Sample std is undefined for a single-value window.
        assert_eq!(bollinger(&flat, 1, 2.0), None);
        assert_eq!(bollinger(&flat[..5], 20, 2.0), None);
    }
}
