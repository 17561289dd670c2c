use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};

use crate::config::with_config;

/// Option side, `C` or `P` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionRight {
    Call,
    Put,
}

impl OptionRight {
    pub fn letter(&self) -> char {
        match self {
            OptionRight::Call => 'C',
            OptionRight::Put => 'P',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionRight::Call => "CALL",
            OptionRight::Put => "PUT",
        }
    }

    /// Inverse of `as_str`, used when loading persisted positions.
    pub fn parse(value: &str) -> Option<OptionRight> {
        match value.to_uppercase().as_str() {
            "CALL" | "C" => Some(OptionRight::Call),
            "PUT" | "P" => Some(OptionRight::Put),
            _ => None,
        }
    }
}

impl fmt::Display for OptionRight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Weekly expiry for contracts opened on `today`.
///
/// A Friday keeps the same day, so Friday entries trade the contract that
/// expires that session.
pub fn next_friday_expiry(today: NaiveDate) -> NaiveDate {
    let days_ahead = (4 - today.weekday().num_days_from_monday() as i64).rem_euclid(7);
    today + Duration::days(days_ahead)
}

/// Round a spot price to the closest listed strike.
pub fn nearest_strike(price: f64, increment: f64) -> f64 {
    if increment <= 0.0 {
        return price;
    }
    (price / increment).round() * increment
}

/// Option root for an underlying. Falls back to the underlying itself when
/// no override is configured (SPX maps to the SPXW weeklies by default).
pub fn option_root(underlying: &str) -> String {
    let upper = underlying.to_uppercase();
    with_config(|config| config.watchlist.option_roots.get(&upper).cloned()).unwrap_or(upper)
}

/// Compact OCC symbol: root, `yymmdd`, right letter, strike in thousandths
/// zero-padded to eight digits (`SPXW250829C06400000`).
pub fn occ_symbol(root: &str, expiry: NaiveDate, right: OptionRight, strike: f64) -> String {
    let thousandths = (strike * 1000.0).round() as i64;
    format!(
        "{}{}{}{:08}",
        root,
        expiry.format("%y%m%d"),
        right.letter(),
        thousandths
    )
}

/// What actually gets ordered for a watched symbol: the shares themselves,
/// or an option contract on the underlying.
#[derive(Debug, Clone, PartialEq)]
pub enum Instrument {
    Stock {
        symbol: String,
    },
    Option {
        underlying: String,
        root: String,
        expiry: NaiveDate,
        right: OptionRight,
        strike: f64,
    },
}

impl Instrument {
    pub fn stock(symbol: &str) -> Self {
        Instrument::Stock {
            symbol: symbol.to_uppercase(),
        }
    }

    /// Contract for `underlying` at the configured strike increment: the
    /// nearest strike to `spot`, expiring on the week's Friday.
    pub fn option_for(underlying: &str, right: OptionRight, spot: f64, today: NaiveDate) -> Self {
        let increment = with_config(|config| config.watchlist.option_strike_increment);
        Instrument::Option {
            underlying: underlying.to_uppercase(),
            root: option_root(underlying),
            expiry: next_friday_expiry(today),
            right,
            strike: nearest_strike(spot, increment),
        }
    }

    /// Symbol string submitted to the broker.
    pub fn order_symbol(&self) -> String {
        match self {
            Instrument::Stock { symbol } => symbol.clone(),
            Instrument::Option {
                root,
                expiry,
                right,
                strike,
                ..
            } => occ_symbol(root, *expiry, *right, *strike),
        }
    }

    /// Human-readable name for logs and the summary table.
    pub fn display_name(&self) -> String {
        match self {
            Instrument::Stock { symbol } => symbol.clone(),
            Instrument::Option {
                underlying,
                expiry,
                right,
                strike,
                ..
            } => format!(
                "{} {} {} {}",
                underlying,
                format_strike(*strike),
                right,
                expiry.format("%Y-%m-%d")
            ),
        }
    }

    pub fn underlying(&self) -> &str {
        match self {
            Instrument::Stock { symbol } => symbol,
            Instrument::Option { underlying, .. } => underlying,
        }
    }

    pub fn is_option(&self) -> bool {
        matches!(self, Instrument::Option { .. })
    }
}

fn format_strike(strike: f64) -> String {
    if strike.fract().abs() < f64::EPSILON {
        format!("{:.0}", strike)
    } else {
        format!("{}", strike)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{init_config_with, Config};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_next_friday_expiry() {
        // Monday rolls forward to the same week's Friday.
        assert_eq!(next_friday_expiry(date(2025, 8, 25)), date(2025, 8, 29));
        // A Friday keeps the same day.
        assert_eq!(next_friday_expiry(date(2025, 8, 29)), date(2025, 8, 29));
        // Saturday and Sunday land on the following Friday.
        assert_eq!(next_friday_expiry(date(2025, 8, 30)), date(2025, 9, 5));
        assert_eq!(next_friday_expiry(date(2025, 8, 31)), date(2025, 9, 5));
    }

    #[test]
    fn test_nearest_strike_rounding() {
        assert_eq!(nearest_strike(6387.3, 25.0), 6375.0);
        assert_eq!(nearest_strike(6390.0, 25.0), 6400.0);
        assert_eq!(nearest_strike(642.4, 5.0), 640.0);
        // Degenerate increment leaves the price untouched.
        assert_eq!(nearest_strike(100.0, 0.0), 100.0);
    }

    #[test]
    fn test_occ_symbol_format() {
        assert_eq!(
            occ_symbol("SPXW", date(2025, 8, 29), OptionRight::Call, 6400.0),
            "SPXW250829C06400000"
        );
        assert_eq!(
            occ_symbol("XSP", date(2025, 9, 5), OptionRight::Put, 642.5),
            "XSP250905P00642500"
        );
    }

    #[test]
    fn test_option_root_uses_config_overrides() {
        init_config_with(Config::default());
        assert_eq!(option_root("SPX"), "SPXW");
        assert_eq!(option_root("spx"), "SPXW");
        assert_eq!(option_root("AAPL"), "AAPL");
    }

    #[test]
    fn test_instrument_symbols() {
        init_config_with(Config::default());

        let stock = Instrument::stock("aapl");
        assert_eq!(stock.order_symbol(), "AAPL");
        assert_eq!(stock.display_name(), "AAPL");
        assert!(!stock.is_option());

        let call = Instrument::option_for("SPX", OptionRight::Call, 6387.3, date(2025, 8, 25));
        assert_eq!(call.order_symbol(), "SPXW250829C06375000");
        assert_eq!(call.display_name(), "SPX 6375 CALL 2025-08-29");
        assert_eq!(call.underlying(), "SPX");
        assert!(call.is_option());
    }
}
