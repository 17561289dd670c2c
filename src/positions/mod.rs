// Position management: in-memory state, SQLite persistence, the
// fill-confirmation queue and the open/close operations built on them.

pub mod apply;
pub mod db;
pub mod operations;
pub mod queue;
pub mod state;
pub mod tracking;
pub mod transitions;
pub mod types;
pub mod worker;

// Public API exports
pub use operations::{close_position_market, open_position_from_signal};

pub use state::{
    available_open_slots, find_by_uuid, get_open_positions, get_positions_snapshot,
    has_open_or_pending, open_position_count, try_acquire_position_lock, PositionLockGuard,
    POSITIONS,
};

pub use apply::{apply_transition, ApplyEffects};
pub use queue::{enqueue_confirmation, queue_len, ConfirmEntry, ConfirmKind};
pub use tracking::{check_exit_levels, record_price, ExitCheck};
pub use transitions::PositionTransition;
pub use types::{derive_tp_sl, InstrumentKind, Position, PositionSide};
pub use worker::confirmation_worker;

use crate::{
    errors::PositionError,
    logger::{log, LogTag},
};

/// Bring the positions system up at startup: open the database, restore
/// open positions into memory, square the capacity semaphore with what was
/// restored, and re-queue every order still awaiting confirmation.
pub async fn initialize_positions() -> Result<(), PositionError> {
    db::init_positions_db().map_err(|e| PositionError::Database(e.to_string()))?;

    let restored = db::load_open_positions().map_err(|e| PositionError::Database(e.to_string()))?;
    if restored.is_empty() {
        log(LogTag::Positions, "INIT", "No open positions to restore");
        return Ok(());
    }

    let mut pending_entries = 0usize;
    let mut pending_exits = 0usize;

    for position in &restored {
        if !position.entry_fill_confirmed {
            if let Some(ref order_id) = position.entry_order_id {
                state::index_order(order_id, &position.position_uuid).await;
                state::mark_pending_open(
                    position.underlying.as_deref().unwrap_or(&position.symbol),
                )
                .await;
                queue::enqueue_confirmation(order_id, &position.position_uuid, ConfirmKind::Entry)
                    .await;
                pending_entries += 1;
            }
        }
        if position.is_exit_pending() {
            if let Some(ref order_id) = position.exit_order_id {
                state::index_order(order_id, &position.position_uuid).await;
                queue::enqueue_confirmation(order_id, &position.position_uuid, ConfirmKind::Exit)
                    .await;
                pending_exits += 1;
            }
        }
    }

    let count = restored.len();
    {
        let mut positions = POSITIONS.write().await;
        positions.extend(restored);
    }

    let claimed = state::reserve_open_slots(count);

    log(
        LogTag::Positions,
        "INIT",
        &format!(
            "♻️ Restored {} open position(s) ({} entry / {} exit confirmation(s) re-queued, {} slot(s) claimed)",
            count, pending_entries, pending_exits, claimed
        ),
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{init_config_with, Config};
    use chrono::Utc;

    fn restored_position(uuid: &str, symbol: &str) -> Position {
        let (tp, sl) = derive_tp_sl(PositionSide::Long, 10.0, 5.0, 3.0);
        Position {
            id: 1,
            position_uuid: uuid.to_string(),
            symbol: symbol.to_string(),
            display_symbol: symbol.to_string(),
            underlying: None,
            side: PositionSide::Long,
            quantity: 1.0,
            instrument_kind: InstrumentKind::Stock,
            option_right: None,
            option_strike: None,
            option_expiry: None,
            entry_order_id: Some(format!("entry-{}", uuid)),
            exit_order_id: None,
            entry_price: 10.0,
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

    #[tokio::test]
    async fn restore_requeues_unconfirmed_entries() {
        init_config_with(Config::default());
        queue::clear_queue().await;

        let dir = tempfile::tempdir().expect("temp dir");
        db::init_positions_db_at(dir.path().join("positions.db")).expect("db init");

        let position = restored_position("init-restore", "INITTEST");
        db::insert_position(&position).expect("insert");

        initialize_positions().await.expect("initialize");

        assert!(find_by_uuid("init-restore").await.is_some());
        assert!(state::is_entry_pending("INITTEST").await);
        assert!(queue_len().await >= 1);
        assert_eq!(
            state::uuid_for_order("entry-init-restore").await.as_deref(),
            Some("init-restore")
        );
    }
}
