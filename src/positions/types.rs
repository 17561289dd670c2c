// Core position types shared by the state, persistence and trading layers

use chrono::{DateTime, NaiveDate, Utc};

use crate::instruments::OptionRight;

// =============================================================================
// SIDE
// =============================================================================

/// Direction of a position.
///
/// Stock reversal-up signals open `Long`, reversal-down open `Short`.
/// Option positions are always `Long` on the premium (the direction lives
/// in the contract right instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSide::Long => "long",
            PositionSide::Short => "short",
        }
    }

    pub fn parse(value: &str) -> Option<PositionSide> {
        match value.to_lowercase().as_str() {
            "long" => Some(PositionSide::Long),
            "short" => Some(PositionSide::Short),
            _ => None,
        }
    }
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// INSTRUMENT KIND
// =============================================================================

/// What kind of contract the position holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentKind {
    Stock,
    Option,
}

impl InstrumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentKind::Stock => "stock",
            InstrumentKind::Option => "option",
        }
    }

    pub fn parse(value: &str) -> Option<InstrumentKind> {
        match value.to_lowercase().as_str() {
            "stock" => Some(InstrumentKind::Stock),
            "option" => Some(InstrumentKind::Option),
            _ => None,
        }
    }
}

// =============================================================================
// POSITION
// =============================================================================

/// A single tracked position, from order submission to confirmed exit.
///
/// `entry_price` holds the signal-time estimate until the entry fill is
/// confirmed; `effective_entry_price` carries the broker's fill average
/// once the confirmation lands. The same split applies on the exit side.
#[derive(Debug, Clone)]
pub struct Position {
    /// Database rowid, 0 until the insert assigns one
    pub id: i64,
    /// Stable identity across memory, database and order client ids
    pub position_uuid: String,

    /// Symbol as submitted to the broker (OCC symbol for options)
    pub symbol: String,
    /// Human-readable name for logs and the summary table
    pub display_symbol: String,
    /// Underlying symbol when this position is an option contract
    pub underlying: Option<String>,

    pub side: PositionSide,
    pub quantity: f64,
    pub instrument_kind: InstrumentKind,
    pub option_right: Option<OptionRight>,
    pub option_strike: Option<f64>,
    pub option_expiry: Option<NaiveDate>,

    pub entry_order_id: Option<String>,
    pub exit_order_id: Option<String>,

    pub entry_price: f64,
    pub effective_entry_price: Option<f64>,
    pub entry_time: DateTime<Utc>,

    pub exit_time: Option<DateTime<Utc>>,
    pub exit_price: Option<f64>,
    pub effective_exit_price: Option<f64>,

    pub take_profit_price: f64,
    pub stop_loss_price: f64,

    pub current_price: Option<f64>,
    pub current_price_updated: Option<DateTime<Utc>>,
    pub price_highest: f64,
    pub price_lowest: f64,

    pub entry_fill_confirmed: bool,
    pub exit_fill_confirmed: bool,

    pub closed_reason: Option<String>,
}

impl Position {
    /// Open means no exit has been recorded yet. A position with an exit
    /// order in flight still counts as open until the fill is confirmed.
    pub fn is_open(&self) -> bool {
        self.exit_time.is_none()
    }

    /// An exit order was submitted and its fill has not been confirmed.
    pub fn is_exit_pending(&self) -> bool {
        self.exit_order_id.is_some() && !self.exit_fill_confirmed
    }

    /// Price the protection levels and PnL are measured against: the
    /// confirmed fill average when available, the signal-time estimate
    /// until then.
    pub fn basis_price(&self) -> f64 {
        match self.effective_entry_price {
            Some(fill) if self.entry_fill_confirmed => fill,
            _ => self.entry_price,
        }
    }

    /// Signed percent move from the basis price, positive when the
    /// position is in profit. Shorts profit when the price falls.
    pub fn unrealized_pnl_pct(&self, current: f64) -> f64 {
        let basis = self.basis_price();
        if basis <= 0.0 {
            return 0.0;
        }
        match self.side {
            PositionSide::Long => ((current - basis) / basis) * 100.0,
            PositionSide::Short => ((basis - current) / basis) * 100.0,
        }
    }

    /// Recompute take-profit and stop-loss from the current basis price.
    /// Called once when the entry confirmation replaces the estimate with
    /// the actual fill average.
    pub fn recompute_protection_levels(&mut self, tp_pct: f64, sl_pct: f64) {
        let (tp, sl) = derive_tp_sl(self.side, self.basis_price(), tp_pct, sl_pct);
        self.take_profit_price = tp;
        self.stop_loss_price = sl;
    }

    /// Fold a fresh price into the running extremes. The first observation
    /// seeds both extremes from the basis price so the range always starts
    /// at the entry.
    pub fn track_price(&mut self, price: f64, at: DateTime<Utc>) {
        if price <= 0.0 || !price.is_finite() {
            return;
        }

        if self.price_highest == 0.0 {
            let basis = self.basis_price();
            self.price_highest = basis;
            self.price_lowest = basis;
        }

        if price > self.price_highest {
            self.price_highest = price;
        }
        if price < self.price_lowest {
            self.price_lowest = price;
        }

        self.current_price = Some(price);
        self.current_price_updated = Some(at);
    }
}

/// Per-side protection levels from a basis price.
///
/// Longs take profit above the basis and stop below it; shorts mirror the
/// two. Option positions are long on the premium, so the long rule applies
/// to them regardless of the contract right.
pub fn derive_tp_sl(side: PositionSide, basis: f64, tp_pct: f64, sl_pct: f64) -> (f64, f64) {
    match side {
        PositionSide::Long => (
            basis * (1.0 + tp_pct / 100.0),
            basis * (1.0 - sl_pct / 100.0),
        ),
        PositionSide::Short => (
            basis * (1.0 - tp_pct / 100.0),
            basis * (1.0 + sl_pct / 100.0),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_position(side: PositionSide) -> Position {
        let (tp, sl) = derive_tp_sl(side, 100.0, 5.0, 3.0);
        Position {
            id: 0,
            position_uuid: "test-uuid".to_string(),
            symbol: "AAPL".to_string(),
            display_symbol: "AAPL".to_string(),
            underlying: None,
            side,
            quantity: 1.0,
            instrument_kind: InstrumentKind::Stock,
            option_right: None,
            option_strike: None,
            option_expiry: None,
            entry_order_id: Some("order-1".to_string()),
            exit_order_id: None,
            entry_price: 100.0,
            effective_entry_price: None,
            entry_time: Utc::now(),
            exit_time: None,
            exit_price: None,
            effective_exit_price: None,
            take_profit_price: tp,
            stop_loss_price: sl,
            current_price: None,
            current_price_updated: None,
            price_highest: 0.0,
            price_lowest: 0.0,
            entry_fill_confirmed: false,
            exit_fill_confirmed: false,
            closed_reason: None,
        }
    }

    #[test]
    fn long_levels_bracket_the_basis() {
        let (tp, sl) = derive_tp_sl(PositionSide::Long, 100.0, 5.0, 3.0);
        assert!((tp - 105.0).abs() < 1e-9);
        assert!((sl - 97.0).abs() < 1e-9);
    }

    #[test]
    fn short_levels_mirror_the_long_ones() {
        let (tp, sl) = derive_tp_sl(PositionSide::Short, 100.0, 5.0, 3.0);
        assert!((tp - 95.0).abs() < 1e-9);
        assert!((sl - 103.0).abs() < 1e-9);
    }

    #[test]
    fn basis_prefers_confirmed_fill() {
        let mut position = sample_position(PositionSide::Long);
        assert_eq!(position.basis_price(), 100.0);

        // An unconfirmed fill average must not move the basis
        position.effective_entry_price = Some(101.5);
        assert_eq!(position.basis_price(), 100.0);

        position.entry_fill_confirmed = true;
        assert_eq!(position.basis_price(), 101.5);
    }

    #[test]
    fn recompute_uses_the_fill_average() {
        let mut position = sample_position(PositionSide::Long);
        position.effective_entry_price = Some(102.0);
        position.entry_fill_confirmed = true;
        position.recompute_protection_levels(5.0, 3.0);

        assert!((position.take_profit_price - 102.0 * 1.05).abs() < 1e-9);
        assert!((position.stop_loss_price - 102.0 * 0.97).abs() < 1e-9);
    }

    #[test]
    fn pnl_sign_follows_the_side() {
        let long = sample_position(PositionSide::Long);
        assert!(long.unrealized_pnl_pct(110.0) > 0.0);
        assert!(long.unrealized_pnl_pct(90.0) < 0.0);

        let short = sample_position(PositionSide::Short);
        assert!(short.unrealized_pnl_pct(90.0) > 0.0);
        assert!(short.unrealized_pnl_pct(110.0) < 0.0);
    }

    #[test]
    fn tracking_seeds_extremes_from_the_basis() {
        let mut position = sample_position(PositionSide::Long);
        position.track_price(104.0, Utc::now());

        assert_eq!(position.price_highest, 104.0);
        assert_eq!(position.price_lowest, 100.0);
        assert_eq!(position.current_price, Some(104.0));

        position.track_price(96.0, Utc::now());
        assert_eq!(position.price_highest, 104.0);
        assert_eq!(position.price_lowest, 96.0);
    }

    #[test]
    fn zero_price_is_ignored() {
        let mut position = sample_position(PositionSide::Long);
        position.track_price(0.0, Utc::now());
        assert_eq!(position.current_price, None);
        assert_eq!(position.price_highest, 0.0);
    }

    #[test]
    fn exit_pending_requires_an_unconfirmed_order() {
        let mut position = sample_position(PositionSide::Long);
        assert!(!position.is_exit_pending());

        position.exit_order_id = Some("exit-1".to_string());
        assert!(position.is_exit_pending());

        position.exit_fill_confirmed = true;
        assert!(!position.is_exit_pending());
    }
}
