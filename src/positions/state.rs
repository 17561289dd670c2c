// In-memory position state: the position list, order-id index, per-symbol
// locks, the global capacity semaphore and the pending-entry registry.

use super::types::Position;
use crate::{
    arguments::is_debug_positions_enabled,
    errors::PositionError,
    logger::{log, LogTag},
};
use chrono::{DateTime, Duration, Utc};
use std::{
    collections::HashMap,
    sync::{Arc, LazyLock},
};
use tokio::sync::{Mutex, OwnedMutexGuard, OwnedSemaphorePermit, RwLock, Semaphore};

// Global state containers
pub static POSITIONS: LazyLock<RwLock<Vec<Position>>> = LazyLock::new(|| RwLock::new(Vec::new()));

// order_id -> position_uuid, so confirmations resolve without scanning
pub static ORDER_INDEX: LazyLock<RwLock<HashMap<String, String>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

// Per-symbol locks serializing open/close flows for the same instrument
static POSITION_LOCKS: LazyLock<RwLock<HashMap<String, Arc<Mutex<()>>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

// Pending entry registry: guards against duplicate opens while an entry
// order is awaiting confirmation. Keys are symbols, values are submit times.
static PENDING_OPEN_ORDERS: LazyLock<RwLock<HashMap<String, DateTime<Utc>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

// Global capacity semaphore enforcing max_open_positions atomically
static GLOBAL_POSITION_SEMAPHORE: LazyLock<Arc<Semaphore>> = LazyLock::new(|| {
    let max_open = crate::config::with_config(|cfg| cfg.trading.max_open_positions);
    Arc::new(Semaphore::new(max_open))
});

/// How long a pending entry blocks new opens for the same symbol
pub const PENDING_OPEN_TTL_SECS: i64 = 120;

// =============================================================================
// PER-SYMBOL LOCKS
// =============================================================================

/// Guard for a per-symbol position lock, released on drop.
#[derive(Debug)]
pub struct PositionLockGuard {
    symbol: String,
    _owned_guard: OwnedMutexGuard<()>,
}

impl Drop for PositionLockGuard {
    fn drop(&mut self) {
        if is_debug_positions_enabled() {
            log(
                LogTag::Positions,
                "DEBUG",
                &format!("🔓 Released position lock for {}", self.symbol),
            );
        }
    }
}

/// Try to take the per-symbol lock without waiting.
///
/// `None` means another open or close flow currently owns the symbol, and
/// the caller should skip this cycle rather than queue behind it.
pub async fn try_acquire_position_lock(symbol: &str) -> Option<PositionLockGuard> {
    let key = symbol.to_uppercase();

    let lock: Arc<Mutex<()>> = {
        let mut locks = POSITION_LOCKS.write().await;
        locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    };

    match lock.try_lock_owned() {
        Ok(owned_guard) => {
            if is_debug_positions_enabled() {
                log(
                    LogTag::Positions,
                    "DEBUG",
                    &format!("🔒 Acquired position lock for {}", key),
                );
            }
            Some(PositionLockGuard {
                symbol: key,
                _owned_guard: owned_guard,
            })
        }
        Err(_) => None,
    }
}

// =============================================================================
// CAPACITY SEMAPHORE
// =============================================================================

/// Claim one open-position slot without waiting.
///
/// The returned permit is dropped (slot returned) on any failure path in
/// the open flow, and `forget()`-ed once the position actually exists so
/// the slot stays claimed until the close returns it via
/// `release_open_slot`.
pub fn acquire_open_slot() -> Result<OwnedSemaphorePermit, PositionError> {
    let semaphore = GLOBAL_POSITION_SEMAPHORE.clone();
    match semaphore.try_acquire_owned() {
        Ok(permit) => {
            if is_debug_positions_enabled() {
                log(
                    LogTag::Positions,
                    "DEBUG",
                    &format!(
                        "🟢 Claimed open slot (remaining: {})",
                        available_open_slots()
                    ),
                );
            }
            Ok(permit)
        }
        Err(_) => Err(PositionError::CapacityExhausted {
            max_open: crate::config::with_config(|cfg| cfg.trading.max_open_positions),
        }),
    }
}

/// Return one open-position slot after a position closes or an entry is
/// rolled back.
pub fn release_open_slot() {
    GLOBAL_POSITION_SEMAPHORE.add_permits(1);
    if is_debug_positions_enabled() {
        log(
            LogTag::Positions,
            "DEBUG",
            &format!(
                "🔴 Returned open slot (remaining: {})",
                available_open_slots()
            ),
        );
    }
}

pub fn available_open_slots() -> usize {
    GLOBAL_POSITION_SEMAPHORE.available_permits()
}

/// Claim slots for positions restored from the database at startup so the
/// semaphore agrees with the loaded state. Returns how many were claimed.
pub fn reserve_open_slots(count: usize) -> usize {
    let mut claimed = 0;
    for _ in 0..count {
        match GLOBAL_POSITION_SEMAPHORE.clone().try_acquire_owned() {
            Ok(permit) => {
                permit.forget();
                claimed += 1;
            }
            Err(_) => {
                log(
                    LogTag::Positions,
                    "WARN",
                    &format!(
                        "More restored positions than capacity: claimed {}/{} slots",
                        claimed, count
                    ),
                );
                break;
            }
        }
    }
    claimed
}

// =============================================================================
// PENDING ENTRIES
// =============================================================================

/// Record that an entry order was just submitted for `symbol`.
pub async fn mark_pending_open(symbol: &str) {
    PENDING_OPEN_ORDERS
        .write()
        .await
        .insert(symbol.to_uppercase(), Utc::now());
}

pub async fn clear_pending_open(symbol: &str) {
    PENDING_OPEN_ORDERS
        .write()
        .await
        .remove(&symbol.to_uppercase());
}

/// Whether an entry order for `symbol` is still awaiting confirmation.
/// Entries past the TTL are swept here rather than by a dedicated task.
pub async fn is_entry_pending(symbol: &str) -> bool {
    let key = symbol.to_uppercase();
    let now = Utc::now();
    let mut pending = PENDING_OPEN_ORDERS.write().await;

    pending.retain(|_, submitted| now - *submitted < Duration::seconds(PENDING_OPEN_TTL_SECS));
    pending.contains_key(&key)
}

// =============================================================================
// POSITION ACCESS
// =============================================================================

/// Add a freshly opened position and index its entry order.
pub async fn add_position(position: Position) {
    if let Some(ref order_id) = position.entry_order_id {
        ORDER_INDEX
            .write()
            .await
            .insert(order_id.clone(), position.position_uuid.clone());
    }
    POSITIONS.write().await.push(position);
}

/// Mutate one position under the write lock and hand back the updated
/// snapshot for persistence. `None` when the uuid is unknown.
pub async fn update_position_state(
    position_uuid: &str,
    updater: impl FnOnce(&mut Position),
) -> Option<Position> {
    let mut positions = POSITIONS.write().await;
    let position = positions
        .iter_mut()
        .find(|p| p.position_uuid == position_uuid)?;
    updater(position);
    Some(position.clone())
}

/// Remove a position outright (failed entry rollback). Clears its order
/// index entries as well.
pub async fn remove_position(position_uuid: &str) -> Option<Position> {
    let removed = {
        let mut positions = POSITIONS.write().await;
        let index = positions
            .iter()
            .position(|p| p.position_uuid == position_uuid)?;
        positions.remove(index)
    };

    let mut index = ORDER_INDEX.write().await;
    if let Some(ref order_id) = removed.entry_order_id {
        index.remove(order_id);
    }
    if let Some(ref order_id) = removed.exit_order_id {
        index.remove(order_id);
    }
    drop(index);

    // Pending entries are keyed by the watched symbol, which for option
    // positions is the underlying rather than the contract symbol
    clear_pending_open(removed.underlying.as_deref().unwrap_or(&removed.symbol)).await;
    Some(removed)
}

pub async fn find_by_uuid(position_uuid: &str) -> Option<Position> {
    POSITIONS
        .read()
        .await
        .iter()
        .find(|p| p.position_uuid == position_uuid)
        .cloned()
}

pub async fn get_positions_snapshot() -> Vec<Position> {
    POSITIONS.read().await.clone()
}

pub async fn get_open_positions() -> Vec<Position> {
    POSITIONS
        .read()
        .await
        .iter()
        .filter(|p| p.is_open())
        .cloned()
        .collect()
}

pub async fn open_position_count() -> usize {
    POSITIONS.read().await.iter().filter(|p| p.is_open()).count()
}

/// An open position exists for the symbol, or an entry is pending on it.
pub async fn has_open_or_pending(symbol: &str) -> bool {
    let key = symbol.to_uppercase();

    {
        let positions = POSITIONS.read().await;
        let open_for_symbol = positions.iter().any(|p| {
            p.is_open() && (p.symbol == key || p.underlying.as_deref() == Some(key.as_str()))
        });
        if open_for_symbol {
            return true;
        }
    }

    is_entry_pending(&key).await
}

// =============================================================================
// ORDER INDEX
// =============================================================================

pub async fn index_order(order_id: &str, position_uuid: &str) {
    ORDER_INDEX
        .write()
        .await
        .insert(order_id.to_string(), position_uuid.to_string());
}

pub async fn unindex_order(order_id: &str) {
    ORDER_INDEX.write().await.remove(order_id);
}

pub async fn uuid_for_order(order_id: &str) -> Option<String> {
    ORDER_INDEX.read().await.get(order_id).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{init_config_with, Config};
    use crate::positions::types::{derive_tp_sl, InstrumentKind, PositionSide};

    fn test_position(uuid: &str, symbol: &str) -> Position {
        let (tp, sl) = derive_tp_sl(PositionSide::Long, 50.0, 5.0, 3.0);
        Position {
            id: 0,
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
            entry_price: 50.0,
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
    async fn symbol_lock_is_exclusive() {
        init_config_with(Config::default());

        let first = try_acquire_position_lock("LOCKTEST").await;
        assert!(first.is_some());

        let second = try_acquire_position_lock("LOCKTEST").await;
        assert!(second.is_none());

        drop(first);
        let third = try_acquire_position_lock("LOCKTEST").await;
        assert!(third.is_some());
    }

    #[tokio::test]
    async fn pending_entries_expire() {
        init_config_with(Config::default());

        mark_pending_open("PENDTEST").await;
        assert!(is_entry_pending("PENDTEST").await);

        // Backdate the entry past the TTL and confirm the sweep drops it
        {
            let mut pending = PENDING_OPEN_ORDERS.write().await;
            pending.insert(
                "PENDTEST".to_string(),
                Utc::now() - Duration::seconds(PENDING_OPEN_TTL_SECS + 1),
            );
        }
        assert!(!is_entry_pending("PENDTEST").await);
    }

    #[tokio::test]
    async fn open_or_pending_sees_the_underlying() {
        init_config_with(Config::default());

        let mut position = test_position("state-underlying", "SPXW250829C06400000");
        position.underlying = Some("UNDERTEST".to_string());
        add_position(position).await;

        assert!(has_open_or_pending("undertest").await);
        assert!(has_open_or_pending("SPXW250829C06400000").await);

        remove_position("state-underlying").await;
        assert!(!has_open_or_pending("UNDERTEST").await);
    }

    #[tokio::test]
    async fn remove_clears_the_order_index() {
        init_config_with(Config::default());

        let position = test_position("state-remove", "REMTEST");
        add_position(position).await;
        assert_eq!(
            uuid_for_order("entry-state-remove").await.as_deref(),
            Some("state-remove")
        );

        let removed = remove_position("state-remove").await;
        assert!(removed.is_some());
        assert!(uuid_for_order("entry-state-remove").await.is_none());
    }

    #[tokio::test]
    async fn update_returns_the_mutated_snapshot() {
        init_config_with(Config::default());

        add_position(test_position("state-update", "UPDTEST")).await;
        let updated = update_position_state("state-update", |p| {
            p.entry_fill_confirmed = true;
            p.effective_entry_price = Some(51.0);
        })
        .await;

        let updated = updated.expect("position present");
        assert!(updated.entry_fill_confirmed);
        assert_eq!(updated.effective_entry_price, Some(51.0));

        remove_position("state-update").await;
    }
}
