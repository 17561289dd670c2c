// Fill-confirmation worker. Polls the broker for queued order states and
// turns each answer into a position transition; order submission never
// waits on this.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Notify;

use super::{
    apply::apply_transition,
    queue::{
        gc_expired_confirmations, poll_due_batch, remove_confirmation, requeue_confirmation,
        ConfirmEntry, ConfirmKind,
    },
    state::find_by_uuid,
    transitions::PositionTransition,
};
use crate::{
    arguments::is_debug_confirm_enabled,
    broker::{broker, Order},
    errors::PositionError,
    logger::{log, LogTag},
    utils::check_shutdown_or_delay,
};

const WORKER_INITIAL_DELAY_SECS: u64 = 2;
const WORKER_INTERVAL_SECS: u64 = 5;
const CONFIRM_BATCH_SIZE: usize = 10;

/// What one confirmation check concluded.
#[derive(Debug)]
enum ConfirmOutcome {
    /// The order reached a terminal state; apply this transition.
    Transition(PositionTransition),
    /// Not resolvable yet; schedule another attempt.
    Retry(String),
}

/// Long-running confirmation loop. First pass runs shortly after startup
/// so restored orders are checked quickly, then the cycle settles at a
/// fixed cadence.
pub async fn confirmation_worker(shutdown: Arc<Notify>) {
    log(LogTag::Confirm, "START", "🔁 Fill confirmation worker started");

    if check_shutdown_or_delay(&shutdown, Duration::from_secs(WORKER_INITIAL_DELAY_SECS)).await {
        return;
    }

    loop {
        run_confirmation_cycle().await;

        if check_shutdown_or_delay(&shutdown, Duration::from_secs(WORKER_INTERVAL_SECS)).await {
            break;
        }
    }

    log(LogTag::Confirm, "STOP", "Fill confirmation worker stopped");
}

/// One pass: expire overdue confirmations, then check a batch of due
/// orders in parallel.
pub async fn run_confirmation_cycle() {
    for expired in gc_expired_confirmations().await {
        handle_expired(expired).await;
    }

    let batch = poll_due_batch(CONFIRM_BATCH_SIZE).await;
    if batch.is_empty() {
        return;
    }

    if is_debug_confirm_enabled() {
        log(
            LogTag::Confirm,
            "DEBUG",
            &format!("Checking {} pending confirmation(s)", batch.len()),
        );
    }

    let checks = batch.into_iter().map(|entry| async move {
        let outcome = check_order(&entry).await;
        (entry, outcome)
    });

    for (entry, outcome) in join_all(checks).await {
        match outcome {
            ConfirmOutcome::Transition(transition) => {
                remove_confirmation(&entry.order_id).await;
                if let Err(e) = apply_transition(transition).await {
                    report_apply_error(&entry, e);
                }
            }
            ConfirmOutcome::Retry(reason) => {
                if is_debug_confirm_enabled() {
                    log(
                        LogTag::Confirm,
                        "DEBUG",
                        &format!(
                            "Order {} not settled (attempt {}): {}",
                            entry.order_id,
                            entry.attempts + 1,
                            reason
                        ),
                    );
                }
                requeue_confirmation(entry).await;
            }
        }
    }
}

/// A confirmation ran out of time or attempts: try to cancel the order at
/// the broker, then push the position onto its failure path.
async fn handle_expired(entry: ConfirmEntry) {
    log(
        LogTag::Confirm,
        "EXPIRED",
        &format!(
            "⏰ {} confirmation for order {} expired after {} attempt(s), {}s in queue",
            entry.kind.as_str(),
            entry.order_id,
            entry.attempts,
            entry.age_seconds()
        ),
    );

    if let Err(e) = broker().cancel_order(&entry.order_id).await {
        log(
            LogTag::Confirm,
            "WARN",
            &format!("Cancel for expired order {} failed: {}", entry.order_id, e),
        );
    }

    let transition = match entry.kind {
        ConfirmKind::Entry => PositionTransition::EntryFailedRemove {
            position_uuid: entry.position_uuid.clone(),
            reason: "confirmation timeout".to_string(),
        },
        ConfirmKind::Exit => PositionTransition::ExitFailedClearForRetry {
            position_uuid: entry.position_uuid.clone(),
            reason: "confirmation timeout".to_string(),
        },
    };

    if let Err(e) = apply_transition(transition).await {
        report_apply_error(&entry, e);
    }
}

/// Fetch the order and classify where it stands.
async fn check_order(entry: &ConfirmEntry) -> ConfirmOutcome {
    let order = match broker().get_order(&entry.order_id).await {
        Ok(order) => order,
        Err(e) => {
            if !e.is_retryable() {
                log(
                    LogTag::Confirm,
                    "WARN",
                    &format!("Order {} lookup failed: {}", entry.order_id, e),
                );
            }
            return ConfirmOutcome::Retry(format!("broker error: {}", e));
        }
    };

    let exit_reason = match entry.kind {
        ConfirmKind::Exit => find_by_uuid(&entry.position_uuid)
            .await
            .and_then(|p| p.closed_reason),
        ConfirmKind::Entry => None,
    };

    classify_confirmation(entry, &order, exit_reason)
}

/// Map a broker order snapshot onto the confirmation outcome.
///
/// A fill without an average price yet is treated as still settling.
/// Terminal non-fill states (canceled, rejected, expired, done for day)
/// take the failure path for their kind.
fn classify_confirmation(
    entry: &ConfirmEntry,
    order: &Order,
    exit_reason: Option<String>,
) -> ConfirmOutcome {
    if order.status.is_fill() {
        let fill_price = match order.filled_avg_price {
            Some(price) if price > 0.0 => price,
            _ => {
                return ConfirmOutcome::Retry("filled without an average price yet".to_string());
            }
        };
        let fill_time = order.filled_at.unwrap_or_else(Utc::now);

        let transition = match entry.kind {
            ConfirmKind::Entry => PositionTransition::EntryVerified {
                position_uuid: entry.position_uuid.clone(),
                fill_price,
                fill_time,
            },
            ConfirmKind::Exit => PositionTransition::ExitVerified {
                position_uuid: entry.position_uuid.clone(),
                fill_price,
                fill_time,
                reason: exit_reason.unwrap_or_else(|| "exit".to_string()),
            },
        };
        return ConfirmOutcome::Transition(transition);
    }

    if order.status.is_terminal() {
        let reason = format!("order {:?}", order.status).to_lowercase();
        let transition = match entry.kind {
            ConfirmKind::Entry => PositionTransition::EntryFailedRemove {
                position_uuid: entry.position_uuid.clone(),
                reason,
            },
            ConfirmKind::Exit => PositionTransition::ExitFailedClearForRetry {
                position_uuid: entry.position_uuid.clone(),
                reason,
            },
        };
        return ConfirmOutcome::Transition(transition);
    }

    ConfirmOutcome::Retry(format!("status {:?} still working", order.status))
}

fn report_apply_error(entry: &ConfirmEntry, error: PositionError) {
    // A missing position usually means the failure path already ran
    let level = match error {
        PositionError::NotFound { .. } => "WARN",
        _ => "ERROR",
    };
    log(
        LogTag::Confirm,
        level,
        &format!(
            "Transition for order {} not applied: {}",
            entry.order_id, error
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{OrderSide, OrderStatus};
    use crate::config::{init_config_with, Config};

    fn order_with_status(status: OrderStatus) -> Order {
        Order {
            id: "order-1".to_string(),
            client_order_id: "client-1".to_string(),
            symbol: "AAPL".to_string(),
            qty: 1.0,
            side: OrderSide::Buy,
            order_type: "market".to_string(),
            time_in_force: "day".to_string(),
            status,
            filled_qty: 0.0,
            filled_avg_price: None,
            submitted_at: Some(Utc::now()),
            filled_at: None,
        }
    }

    fn confirm_entry(kind: ConfirmKind) -> ConfirmEntry {
        ConfirmEntry::new("order-1".to_string(), "uuid-1".to_string(), kind)
    }

    #[test]
    fn filled_entry_becomes_entry_verified() {
        init_config_with(Config::default());

        let mut order = order_with_status(OrderStatus::Filled);
        order.filled_qty = 1.0;
        order.filled_avg_price = Some(123.45);
        order.filled_at = Some(Utc::now());

        let outcome = classify_confirmation(&confirm_entry(ConfirmKind::Entry), &order, None);
        match outcome {
            ConfirmOutcome::Transition(PositionTransition::EntryVerified {
                position_uuid,
                fill_price,
                ..
            }) => {
                assert_eq!(position_uuid, "uuid-1");
                assert_eq!(fill_price, 123.45);
            }
            other => panic!("expected EntryVerified, got {:?}", other),
        }
    }

    #[test]
    fn filled_exit_carries_the_recorded_reason() {
        init_config_with(Config::default());

        let mut order = order_with_status(OrderStatus::Filled);
        order.filled_avg_price = Some(99.0);

        let outcome = classify_confirmation(
            &confirm_entry(ConfirmKind::Exit),
            &order,
            Some("take_profit".to_string()),
        );
        match outcome {
            ConfirmOutcome::Transition(PositionTransition::ExitVerified { reason, .. }) => {
                assert_eq!(reason, "take_profit");
            }
            other => panic!("expected ExitVerified, got {:?}", other),
        }
    }

    #[test]
    fn fill_without_average_price_retries() {
        init_config_with(Config::default());

        let order = order_with_status(OrderStatus::Filled);
        let outcome = classify_confirmation(&confirm_entry(ConfirmKind::Entry), &order, None);
        assert!(matches!(outcome, ConfirmOutcome::Retry(_)));
    }

    #[test]
    fn rejected_entry_rolls_the_position_back() {
        init_config_with(Config::default());

        let order = order_with_status(OrderStatus::Rejected);
        let outcome = classify_confirmation(&confirm_entry(ConfirmKind::Entry), &order, None);
        assert!(matches!(
            outcome,
            ConfirmOutcome::Transition(PositionTransition::EntryFailedRemove { .. })
        ));
    }

    #[test]
    fn canceled_exit_clears_for_retry() {
        init_config_with(Config::default());

        let order = order_with_status(OrderStatus::Canceled);
        let outcome = classify_confirmation(&confirm_entry(ConfirmKind::Exit), &order, None);
        assert!(matches!(
            outcome,
            ConfirmOutcome::Transition(PositionTransition::ExitFailedClearForRetry { .. })
        ));
    }

    #[test]
    fn working_states_keep_retrying() {
        init_config_with(Config::default());

        for status in [
            OrderStatus::New,
            OrderStatus::Accepted,
            OrderStatus::PendingNew,
            OrderStatus::PartiallyFilled,
        ] {
            let order = order_with_status(status);
            let outcome = classify_confirmation(&confirm_entry(ConfirmKind::Entry), &order, None);
            assert!(
                matches!(outcome, ConfirmOutcome::Retry(_)),
                "{:?} should retry",
                status
            );
        }
    }
}
