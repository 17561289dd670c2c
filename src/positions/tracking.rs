// Price tracking and exit-level checks for open positions.

use super::{apply::apply_transition, transitions::PositionTransition, types::Position};
use crate::{
    logger::{log, LogTag},
    positions::types::PositionSide,
};

/// Which protection level a price crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCheck {
    TakeProfit,
    StopLoss,
}

impl ExitCheck {
    pub fn reason(&self) -> &'static str {
        match self {
            ExitCheck::TakeProfit => "take_profit",
            ExitCheck::StopLoss => "stop_loss",
        }
    }
}

/// Fold a fresh price into the position's running extremes. Memory-only;
/// a missing position (just closed) is not an error here.
pub async fn record_price(position_uuid: &str, price: f64) {
    let transition = PositionTransition::PriceTracked {
        position_uuid: position_uuid.to_string(),
        price,
    };
    if let Err(e) = apply_transition(transition).await {
        log(
            LogTag::Positions,
            "DEBUG",
            &format!("Price tick for {} dropped: {}", position_uuid, e),
        );
    }
}

/// Compare a price against the position's protection levels.
///
/// Levels derived from the entry estimate are not acted on; the check
/// waits for the confirmed fill basis. Longs exit at or above the
/// take-profit and at or below the stop; shorts mirror both comparisons.
pub fn check_exit_levels(position: &Position, price: f64) -> Option<ExitCheck> {
    if !position.entry_fill_confirmed {
        return None;
    }
    if price <= 0.0 || !price.is_finite() {
        return None;
    }
    if position.take_profit_price <= 0.0 || position.stop_loss_price <= 0.0 {
        return None;
    }

    match position.side {
        PositionSide::Long => {
            if price >= position.take_profit_price {
                Some(ExitCheck::TakeProfit)
            } else if price <= position.stop_loss_price {
                Some(ExitCheck::StopLoss)
            } else {
                None
            }
        }
        PositionSide::Short => {
            if price <= position.take_profit_price {
                Some(ExitCheck::TakeProfit)
            } else if price >= position.stop_loss_price {
                Some(ExitCheck::StopLoss)
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::positions::types::{derive_tp_sl, InstrumentKind};
    use chrono::Utc;

    fn confirmed_position(side: PositionSide) -> Position {
        let (tp, sl) = derive_tp_sl(side, 100.0, 5.0, 3.0);
        Position {
            id: 0,
            position_uuid: "track-test".to_string(),
            symbol: "TEST".to_string(),
            display_symbol: "TEST".to_string(),
            underlying: None,
            side,
            quantity: 1.0,
            instrument_kind: InstrumentKind::Stock,
            option_right: None,
            option_strike: None,
            option_expiry: None,
            entry_order_id: None,
            exit_order_id: None,
            entry_price: 100.0,
            effective_entry_price: Some(100.0),
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
            entry_fill_confirmed: true,
            exit_fill_confirmed: false,
            closed_reason: None,
        }
    }

    #[test]
    fn long_exits_on_both_levels() {
        let position = confirmed_position(PositionSide::Long);

        assert_eq!(check_exit_levels(&position, 105.0), Some(ExitCheck::TakeProfit));
        assert_eq!(check_exit_levels(&position, 106.0), Some(ExitCheck::TakeProfit));
        assert_eq!(check_exit_levels(&position, 97.0), Some(ExitCheck::StopLoss));
        assert_eq!(check_exit_levels(&position, 96.0), Some(ExitCheck::StopLoss));
        assert_eq!(check_exit_levels(&position, 100.0), None);
        assert_eq!(check_exit_levels(&position, 104.99), None);
    }

    #[test]
    fn short_mirrors_the_comparisons() {
        let position = confirmed_position(PositionSide::Short);

        // Short TP sits below the basis, SL above it
        assert_eq!(check_exit_levels(&position, 95.0), Some(ExitCheck::TakeProfit));
        assert_eq!(check_exit_levels(&position, 90.0), Some(ExitCheck::TakeProfit));
        assert_eq!(check_exit_levels(&position, 103.0), Some(ExitCheck::StopLoss));
        assert_eq!(check_exit_levels(&position, 108.0), Some(ExitCheck::StopLoss));
        assert_eq!(check_exit_levels(&position, 100.0), None);
    }

    #[test]
    fn unconfirmed_entries_never_trigger() {
        let mut position = confirmed_position(PositionSide::Long);
        position.entry_fill_confirmed = false;

        assert_eq!(check_exit_levels(&position, 200.0), None);
        assert_eq!(check_exit_levels(&position, 1.0), None);
    }

    #[test]
    fn junk_prices_are_ignored() {
        let position = confirmed_position(PositionSide::Long);

        assert_eq!(check_exit_levels(&position, 0.0), None);
        assert_eq!(check_exit_levels(&position, -5.0), None);
        assert_eq!(check_exit_levels(&position, f64::NAN), None);
    }

    #[test]
    fn exit_reasons_name_the_level() {
        assert_eq!(ExitCheck::TakeProfit.reason(), "take_profit");
        assert_eq!(ExitCheck::StopLoss.reason(), "stop_loss");
    }
}
