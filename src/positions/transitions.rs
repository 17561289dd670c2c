// Position state transitions. Every mutation of a live position flows
// through one of these variants and the single writer in apply.rs.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub enum PositionTransition {
    /// Entry order filled; the broker's average becomes the basis price.
    EntryVerified {
        position_uuid: String,
        fill_price: f64,
        fill_time: DateTime<Utc>,
    },
    /// Entry order died (canceled, rejected, expired or timed out).
    /// The position is rolled back as if it never existed.
    EntryFailedRemove {
        position_uuid: String,
        reason: String,
    },
    /// Exit order filled; the position is closed.
    ExitVerified {
        position_uuid: String,
        fill_price: f64,
        fill_time: DateTime<Utc>,
        reason: String,
    },
    /// Exit order died; clear it so the monitor can submit a fresh one.
    ExitFailedClearForRetry {
        position_uuid: String,
        reason: String,
    },
    /// Fresh market price observed. Memory-only, never persisted.
    PriceTracked {
        position_uuid: String,
        price: f64,
    },
}

impl PositionTransition {
    pub fn position_uuid(&self) -> &str {
        match self {
            PositionTransition::EntryVerified { position_uuid, .. }
            | PositionTransition::EntryFailedRemove { position_uuid, .. }
            | PositionTransition::ExitVerified { position_uuid, .. }
            | PositionTransition::ExitFailedClearForRetry { position_uuid, .. }
            | PositionTransition::PriceTracked { position_uuid, .. } => position_uuid,
        }
    }

    /// Terminal transitions end the position's life in memory: either the
    /// entry never happened or the exit is confirmed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PositionTransition::EntryFailedRemove { .. }
                | PositionTransition::ExitVerified { .. }
        )
    }

    /// Price ticks stay in memory; everything else reaches the database.
    pub fn requires_db_write(&self) -> bool {
        !matches!(self, PositionTransition::PriceTracked { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            PositionTransition::EntryVerified { .. } => "entry_verified",
            PositionTransition::EntryFailedRemove { .. } => "entry_failed_remove",
            PositionTransition::ExitVerified { .. } => "exit_verified",
            PositionTransition::ExitFailedClearForRetry { .. } => "exit_failed_clear_for_retry",
            PositionTransition::PriceTracked { .. } => "price_tracked",
        }
    }
}
