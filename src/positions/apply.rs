// The single writer for position state. Confirmation worker, tracker and
// operations all funnel their mutations through apply_transition, which
// keeps memory, database and the capacity semaphore in step.

use super::{
    db,
    state::{
        clear_pending_open, release_open_slot, remove_position, unindex_order,
        update_position_state,
    },
    transitions::PositionTransition,
};
use crate::{
    arguments::is_debug_positions_enabled,
    errors::PositionError,
    logger::{log, LogTag},
    utils::format_price,
};
use chrono::Utc;

#[derive(Debug, Default)]
pub struct ApplyEffects {
    pub db_updated: bool,
    pub position_removed: bool,
    pub position_closed: bool,
}

/// Apply a transition to memory, persist it, and settle capacity.
///
/// Memory is mutated first, then permits are returned for terminal
/// transitions, then the database write runs. A failed persist therefore
/// never leaves the semaphore out of step with the in-memory state.
pub async fn apply_transition(transition: PositionTransition) -> Result<ApplyEffects, PositionError> {
    let mut effects = ApplyEffects::default();

    match transition {
        PositionTransition::EntryVerified {
            position_uuid,
            fill_price,
            fill_time,
        } => {
            let (tp_pct, sl_pct) = crate::config::with_config(|cfg| {
                (cfg.trading.take_profit_pct, cfg.trading.stop_loss_pct)
            });

            let updated = update_position_state(&position_uuid, |pos| {
                pos.entry_fill_confirmed = true;
                pos.effective_entry_price = Some(fill_price);
                pos.entry_time = fill_time;
                pos.recompute_protection_levels(tp_pct, sl_pct);
            })
            .await
            .ok_or(PositionError::NotFound {
                position_uuid: position_uuid.clone(),
            })?;

            clear_pending_open(updated.underlying.as_deref().unwrap_or(&updated.symbol)).await;
            if let Some(ref order_id) = updated.entry_order_id {
                unindex_order(order_id).await;
            }

            db::update_position(&updated)
                .map_err(|e| PositionError::Database(e.to_string()))?;
            effects.db_updated = true;

            log(
                LogTag::Positions,
                "CONFIRMED",
                &format!(
                    "✅ Entry filled: {} {} x{} @ {} (tp {} / sl {})",
                    updated.display_symbol,
                    updated.side,
                    updated.quantity,
                    format_price(fill_price),
                    format_price(updated.take_profit_price),
                    format_price(updated.stop_loss_price)
                ),
            );
        }

        PositionTransition::EntryFailedRemove {
            position_uuid,
            reason,
        } => {
            let removed =
                remove_position(&position_uuid)
                    .await
                    .ok_or(PositionError::NotFound {
                        position_uuid: position_uuid.clone(),
                    })?;

            // The slot is free again the moment the position leaves memory
            release_open_slot();
            effects.position_removed = true;

            db::mark_closed(
                &position_uuid,
                &format!("entry_failed: {}", reason),
                Utc::now(),
            )
            .map_err(|e| PositionError::Database(e.to_string()))?;
            effects.db_updated = true;

            log(
                LogTag::Positions,
                "REMOVED",
                &format!(
                    "🗑️ Entry failed for {} ({}): position rolled back",
                    removed.display_symbol, reason
                ),
            );
        }

        PositionTransition::ExitVerified {
            position_uuid,
            fill_price,
            fill_time,
            reason,
        } => {
            let reason_for_log = reason.clone();
            let updated = update_position_state(&position_uuid, |pos| {
                pos.exit_fill_confirmed = true;
                pos.effective_exit_price = Some(fill_price);
                pos.exit_time = Some(fill_time);
                pos.closed_reason = Some(reason);
            })
            .await
            .ok_or(PositionError::NotFound {
                position_uuid: position_uuid.clone(),
            })?;

            if let Some(ref order_id) = updated.exit_order_id {
                unindex_order(order_id).await;
            }

            release_open_slot();
            effects.position_closed = true;

            db::update_position(&updated)
                .map_err(|e| PositionError::Database(e.to_string()))?;
            effects.db_updated = true;

            log(
                LogTag::Positions,
                "CLOSED",
                &format!(
                    "🏁 Exit filled: {} {} @ {} ({}, pnl {:+.2}%)",
                    updated.display_symbol,
                    updated.side,
                    format_price(fill_price),
                    reason_for_log,
                    updated.unrealized_pnl_pct(fill_price)
                ),
            );
        }

        PositionTransition::ExitFailedClearForRetry {
            position_uuid,
            reason,
        } => {
            let mut stale_order: Option<String> = None;
            let updated = update_position_state(&position_uuid, |pos| {
                stale_order = pos.exit_order_id.take();
                pos.exit_price = None;
            })
            .await
            .ok_or(PositionError::NotFound {
                position_uuid: position_uuid.clone(),
            })?;

            if let Some(ref order_id) = stale_order {
                unindex_order(order_id).await;
            }

            db::update_position(&updated)
                .map_err(|e| PositionError::Database(e.to_string()))?;
            effects.db_updated = true;

            log(
                LogTag::Positions,
                "RETRY",
                &format!(
                    "♻️ Exit failed for {} ({}): order cleared, monitor will retry",
                    updated.display_symbol, reason
                ),
            );
        }

        PositionTransition::PriceTracked {
            position_uuid,
            price,
        } => {
            let updated = update_position_state(&position_uuid, |pos| {
                pos.track_price(price, Utc::now());
            })
            .await
            .ok_or(PositionError::NotFound {
                position_uuid: position_uuid.clone(),
            })?;

            if is_debug_positions_enabled() {
                log(
                    LogTag::Positions,
                    "DEBUG",
                    &format!(
                        "📈 {} price {} (hi {} / lo {})",
                        updated.display_symbol,
                        format_price(price),
                        format_price(updated.price_highest),
                        format_price(updated.price_lowest)
                    ),
                );
            }
        }
    }

    Ok(effects)
}
