// Opening and closing positions. Both paths submit a market order, record
// the position, and leave fill confirmation to the worker.

use chrono::Utc;
use uuid::Uuid;

use super::{
    db,
    queue::{enqueue_confirmation, ConfirmKind},
    state::{
        acquire_open_slot, add_position, find_by_uuid, has_open_or_pending, index_order,
        mark_pending_open, try_acquire_position_lock, update_position_state,
    },
    types::{derive_tp_sl, InstrumentKind, Position, PositionSide},
};
use crate::{
    broker::{broker, OrderSide},
    errors::{BrokerError, PositionError},
    instruments::{Instrument, OptionRight},
    logger::{log, LogTag},
    signals::Signal,
    utils::format_price,
    watchlist::is_option_symbol,
};

/// Entry direction implied by a signal.
///
/// Shares trade both ways; option symbols express direction through the
/// contract right and are always bought.
fn entry_plan(signal: Signal, option: bool) -> (PositionSide, OrderSide, Option<OptionRight>) {
    if option {
        let right = match signal {
            Signal::ReversalUp => OptionRight::Call,
            Signal::ReversalDown => OptionRight::Put,
        };
        (PositionSide::Long, OrderSide::Buy, Some(right))
    } else {
        match signal {
            Signal::ReversalUp => (PositionSide::Long, OrderSide::Buy, None),
            Signal::ReversalDown => (PositionSide::Short, OrderSide::Sell, None),
        }
    }
}

/// Side of the closing order. Options close by selling the contract back;
/// shares close against the entry side.
fn exit_order_side(position: &Position) -> OrderSide {
    match position.instrument_kind {
        InstrumentKind::Option => OrderSide::Sell,
        InstrumentKind::Stock => match position.side {
            PositionSide::Long => OrderSide::Sell,
            PositionSide::Short => OrderSide::Buy,
        },
    }
}

/// Options trade in whole contracts; shares keep the configured quantity.
fn order_quantity(configured: f64, option: bool) -> f64 {
    if option {
        configured.round().max(1.0)
    } else {
        configured
    }
}

/// Cost the order is expected to tie up, for the buying-power probe.
/// Option contracts carry a 100x multiplier.
fn estimated_cost(price: f64, quantity: f64, option: bool) -> f64 {
    let multiplier = if option { 100.0 } else { 1.0 };
    price * quantity * multiplier
}

/// Best available price right now: the latest trade, falling back to the
/// most recent cached close.
async fn estimate_price(symbol: &str) -> Result<f64, PositionError> {
    match broker().latest_quote(symbol).await {
        Ok(quote) => {
            if let Some(price) = quote.price {
                if price > 0.0 {
                    return Ok(price);
                }
            }
        }
        Err(e) => {
            log(
                LogTag::Positions,
                "WARN",
                &format!("Quote for {} failed, trying cached close: {}", symbol, e),
            );
        }
    }

    match crate::marketdata::latest_close(symbol) {
        Some(close) if close > 0.0 => Ok(close),
        _ => Err(PositionError::NoEntryPrice {
            symbol: symbol.to_string(),
        }),
    }
}

/// Open a position for a detected reversal.
///
/// Claims an open slot, serializes on the symbol, probes buying power,
/// submits a market entry and records the position everywhere it needs to
/// exist. The slot is only kept (`forget`) once the position is live; any
/// earlier failure returns it by dropping the permit.
pub async fn open_position_from_signal(
    symbol: &str,
    signal: Signal,
) -> Result<Position, PositionError> {
    let symbol = symbol.to_uppercase();

    let permit = acquire_open_slot()?;

    let _lock = try_acquire_position_lock(&symbol)
        .await
        .ok_or(PositionError::LockBusy {
            symbol: symbol.clone(),
        })?;

    if has_open_or_pending(&symbol).await {
        return Err(PositionError::PendingEntry {
            symbol: symbol.clone(),
        });
    }

    let (quantity_cfg, tp_pct, sl_pct) = crate::config::with_config(|cfg| {
        (
            cfg.trading.quantity,
            cfg.trading.take_profit_pct,
            cfg.trading.stop_loss_pct,
        )
    });

    let option = is_option_symbol(&symbol);
    let (side, order_side, right) = entry_plan(signal, option);
    let quantity = order_quantity(quantity_cfg, option);

    // Spot drives strike selection for options and doubles as the share
    // price estimate
    let spot = estimate_price(&symbol).await?;

    let instrument = match right {
        Some(right) => Instrument::option_for(&symbol, right, spot, Utc::now().date_naive()),
        None => Instrument::stock(&symbol),
    };
    let order_symbol = instrument.order_symbol();

    // For contracts, prefer a quoted premium; the underlying spot is only
    // a placeholder until the fill average replaces it
    let entry_estimate = if instrument.is_option() {
        match broker().latest_quote(&order_symbol).await {
            Ok(quote) => quote.price.filter(|p| *p > 0.0).unwrap_or(spot),
            Err(_) => spot,
        }
    } else {
        spot
    };

    let account = broker().get_account().await?;
    let cost = estimated_cost(entry_estimate, quantity, option);
    if account.buying_power < cost {
        return Err(PositionError::Broker(BrokerError::OrderRejected {
            symbol: order_symbol,
            reason: format!(
                "insufficient buying power: {:.2} available, {:.2} required",
                account.buying_power, cost
            ),
        }));
    }

    let position_uuid = Uuid::new_v4().to_string();
    let order = broker()
        .submit_market_order(&order_symbol, order_side, quantity, &position_uuid)
        .await?;

    let (take_profit_price, stop_loss_price) = derive_tp_sl(side, entry_estimate, tp_pct, sl_pct);

    let (option_strike, option_expiry) = match &instrument {
        Instrument::Option { strike, expiry, .. } => (Some(*strike), Some(*expiry)),
        Instrument::Stock { .. } => (None, None),
    };

    let mut position = Position {
        id: 0,
        position_uuid: position_uuid.clone(),
        symbol: order_symbol.clone(),
        display_symbol: instrument.display_name(),
        underlying: option.then(|| symbol.clone()),
        side,
        quantity,
        instrument_kind: if option {
            InstrumentKind::Option
        } else {
            InstrumentKind::Stock
        },
        option_right: right,
        option_strike,
        option_expiry,
        entry_order_id: Some(order.id.clone()),
        exit_order_id: None,
        entry_price: entry_estimate,
        effective_entry_price: None,
        entry_time: order.submitted_at.unwrap_or_else(Utc::now),
        exit_time: None,
        exit_price: None,
        effective_exit_price: None,
        take_profit_price,
        stop_loss_price,
        current_price: None,
        current_price_updated: None,
        price_highest: 0.0,
        price_lowest: 0.0,
        entry_fill_confirmed: false,
        exit_fill_confirmed: false,
        closed_reason: None,
    };

    match db::insert_position(&position) {
        Ok(id) => {
            position.id = id;
        }
        Err(e) => {
            // The order is already out; try to pull it back before bailing
            if let Err(cancel_err) = broker().cancel_order(&order.id).await {
                log(
                    LogTag::Positions,
                    "ERROR",
                    &format!(
                        "Cancel after failed insert also failed for {}: {}",
                        order_symbol, cancel_err
                    ),
                );
            }
            return Err(PositionError::Database(e.to_string()));
        }
    }

    add_position(position.clone()).await;
    mark_pending_open(&symbol).await;
    enqueue_confirmation(&order.id, &position_uuid, ConfirmKind::Entry).await;

    // The slot now belongs to the position until a close returns it
    permit.forget();

    log(
        LogTag::Positions,
        "OPEN",
        &format!(
            "📥 Submitted {} {} x{} @ ~{} on {} (order {})",
            side,
            position.display_symbol,
            quantity,
            format_price(entry_estimate),
            signal,
            order.id
        ),
    );

    Ok(position)
}

/// Submit a market order closing the position and queue its confirmation.
///
/// The position stays open (and keeps its slot) until the exit fill is
/// confirmed; `reason` is recorded now so the confirmation carries it into
/// the close.
pub async fn close_position_market(position_uuid: &str, reason: &str) -> Result<(), PositionError> {
    let position = find_by_uuid(position_uuid)
        .await
        .ok_or(PositionError::NotFound {
            position_uuid: position_uuid.to_string(),
        })?;

    let _lock =
        try_acquire_position_lock(&position.symbol)
            .await
            .ok_or(PositionError::LockBusy {
                symbol: position.symbol.clone(),
            })?;

    // Re-read under the lock; the first snapshot may have raced a confirm
    let position = find_by_uuid(position_uuid)
        .await
        .ok_or(PositionError::NotFound {
            position_uuid: position_uuid.to_string(),
        })?;

    if !position.is_open() {
        log(
            LogTag::Positions,
            "SKIP",
            &format!("{} already closed", position.display_symbol),
        );
        return Ok(());
    }

    if position.is_exit_pending() {
        return Err(PositionError::AlreadyExiting {
            symbol: position.symbol.clone(),
        });
    }

    let side = exit_order_side(&position);
    let client_order_id = Uuid::new_v4().to_string();

    let order = broker()
        .submit_market_order(&position.symbol, side, position.quantity, &client_order_id)
        .await?;

    let exit_estimate = position.current_price;
    let reason_owned = reason.to_string();
    let order_id = order.id.clone();

    let updated = update_position_state(position_uuid, |pos| {
        pos.exit_order_id = Some(order_id);
        pos.exit_price = exit_estimate;
        pos.closed_reason = Some(reason_owned);
    })
    .await
    .ok_or(PositionError::NotFound {
        position_uuid: position_uuid.to_string(),
    })?;

    if let Err(e) = db::update_position(&updated) {
        log(
            LogTag::Positions,
            "ERROR",
            &format!(
                "Exit order for {} submitted but not persisted: {}",
                updated.display_symbol, e
            ),
        );
    }

    index_order(&order.id, position_uuid).await;
    enqueue_confirmation(&order.id, position_uuid, ConfirmKind::Exit).await;

    log(
        LogTag::Positions,
        "CLOSE",
        &format!(
            "📤 Submitted {} to close {} ({}, order {})",
            side, updated.display_symbol, reason, order.id
        ),
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_signals_map_to_both_sides() {
        let (side, order_side, right) = entry_plan(Signal::ReversalUp, false);
        assert_eq!(side, PositionSide::Long);
        assert_eq!(order_side, OrderSide::Buy);
        assert!(right.is_none());

        let (side, order_side, right) = entry_plan(Signal::ReversalDown, false);
        assert_eq!(side, PositionSide::Short);
        assert_eq!(order_side, OrderSide::Sell);
        assert!(right.is_none());
    }

    #[test]
    fn option_signals_buy_the_matching_right() {
        let (side, order_side, right) = entry_plan(Signal::ReversalUp, true);
        assert_eq!(side, PositionSide::Long);
        assert_eq!(order_side, OrderSide::Buy);
        assert_eq!(right, Some(OptionRight::Call));

        let (side, order_side, right) = entry_plan(Signal::ReversalDown, true);
        assert_eq!(side, PositionSide::Long);
        assert_eq!(order_side, OrderSide::Buy);
        assert_eq!(right, Some(OptionRight::Put));
    }

    #[test]
    fn contracts_round_to_whole_lots() {
        assert_eq!(order_quantity(2.4, true), 2.0);
        assert_eq!(order_quantity(2.6, true), 3.0);
        assert_eq!(order_quantity(0.3, true), 1.0);
        assert_eq!(order_quantity(2.4, false), 2.4);
    }

    #[test]
    fn option_cost_applies_the_contract_multiplier() {
        assert_eq!(estimated_cost(2.5, 2.0, true), 500.0);
        assert_eq!(estimated_cost(2.5, 2.0, false), 5.0);
    }

    #[test]
    fn exits_oppose_the_entry() {
        use crate::positions::types::derive_tp_sl;
        use chrono::Utc;

        let build = |side: PositionSide, kind: InstrumentKind| {
            let (tp, sl) = derive_tp_sl(side, 100.0, 5.0, 3.0);
            Position {
                id: 0,
                position_uuid: "ops-exit".to_string(),
                symbol: "TEST".to_string(),
                display_symbol: "TEST".to_string(),
                underlying: None,
                side,
                quantity: 1.0,
                instrument_kind: kind,
                option_right: None,
                option_strike: None,
                option_expiry: None,
                entry_order_id: None,
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
                entry_fill_confirmed: true,
                exit_fill_confirmed: false,
                closed_reason: None,
            }
        };

        assert_eq!(
            exit_order_side(&build(PositionSide::Long, InstrumentKind::Stock)),
            OrderSide::Sell
        );
        assert_eq!(
            exit_order_side(&build(PositionSide::Short, InstrumentKind::Stock)),
            OrderSide::Buy
        );
        // Options are long premium regardless of direction
        assert_eq!(
            exit_order_side(&build(PositionSide::Long, InstrumentKind::Option)),
            OrderSide::Sell
        );
    }
}
