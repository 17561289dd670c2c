// Core types for market data

use chrono::{ DateTime, Utc };
use serde::{ Deserialize, Serialize };
use std::fmt;

/// Supported bar timeframes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1Min")]
    M1,
    #[serde(rename = "5Min")]
    M5,
    #[serde(rename = "15Min")]
    M15,
    #[serde(rename = "1Hour")]
    H1,
    #[serde(rename = "1Day")]
    D1,
}

impl Timeframe {
    /// Returns the duration in seconds for this timeframe
    pub fn to_seconds(&self) -> i64 {
        match self {
            Timeframe::M1 => 60,
            Timeframe::M5 => 300,
            Timeframe::M15 => 900,
            Timeframe::H1 => 3600,
            Timeframe::D1 => 86400,
        }
    }

    /// Wire string used by the data API
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1Min",
            Timeframe::M5 => "5Min",
            Timeframe::M15 => "15Min",
            Timeframe::H1 => "1Hour",
            Timeframe::D1 => "1Day",
        }
    }

    /// Parse from the wire string
    pub fn from_str(s: &str) -> Option<Timeframe> {
        match s {
            "1Min" => Some(Timeframe::M1),
            "5Min" => Some(Timeframe::M5),
            "15Min" => Some(Timeframe::M15),
            "1Hour" => Some(Timeframe::H1),
            "1Day" => Some(Timeframe::D1),
            _ => None,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single OHLCV bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Validates that the bar is internally consistent
    pub fn is_valid(&self) -> bool {
        self.open.is_finite() &&
            self.high.is_finite() &&
            self.low.is_finite() &&
            self.close.is_finite() &&
            self.high >= self.low &&
            self.volume >= 0.0
    }

    /// Absolute distance between open and close
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Full high-to-low extent
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Wick above the body
    pub fn upper_shadow(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    /// Wick below the body
    pub fn lower_shadow(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp: Utc.with_ymd_and_hms(2024, 6, 3, 14, 30, 0).unwrap(),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn test_timeframe_wire_strings() {
        assert_eq!(Timeframe::M15.as_str(), "15Min");
        assert_eq!(Timeframe::from_str("15Min"), Some(Timeframe::M15));
        assert_eq!(Timeframe::from_str("2Min"), None);
        assert_eq!(Timeframe::M15.to_seconds(), 900);
    }

    #[test]
    fn test_candle_anatomy() {
        // Hammer: long lower wick, small body near the top
        let hammer = candle(100.0, 101.0, 90.0, 100.5);
        assert!((hammer.body() - 0.5).abs() < 1e-9);
        assert!((hammer.range() - 11.0).abs() < 1e-9);
        assert!((hammer.upper_shadow() - 0.5).abs() < 1e-9);
        assert!((hammer.lower_shadow() - 10.0).abs() < 1e-9);
        assert!(hammer.is_bullish());
    }

    #[test]
    fn test_candle_validity() {
        assert!(candle(100.0, 101.0, 99.0, 100.5).is_valid());
        // High below low is broken data
        assert!(!candle(100.0, 99.0, 101.0, 100.5).is_valid());
        assert!(!candle(f64::NAN, 101.0, 99.0, 100.5).is_valid());
        // Flat bar with zero range is fine
        assert!(candle(100.0, 100.0, 100.0, 100.0).is_valid());
    }
}
