// Fill-confirmation queue. Order submissions enqueue here and the
// confirmation worker drains it; nothing in the trading path ever blocks
// waiting for a fill.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::VecDeque;
use std::sync::LazyLock;
use tokio::sync::RwLock;

/// Retries stop and the entry is treated as expired past this many attempts.
pub const MAX_CONFIRM_ATTEMPTS: u8 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmKind {
    Entry,
    Exit,
}

impl ConfirmKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmKind::Entry => "entry",
            ConfirmKind::Exit => "exit",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfirmEntry {
    pub order_id: String,
    pub position_uuid: String,
    pub kind: ConfirmKind,
    pub attempts: u8,
    pub enqueued_at: DateTime<Utc>,
    pub next_attempt_at: DateTime<Utc>,
}

impl ConfirmEntry {
    pub fn new(order_id: String, position_uuid: String, kind: ConfirmKind) -> Self {
        let now = Utc::now();
        Self {
            order_id,
            position_uuid,
            kind,
            attempts: 0,
            enqueued_at: now,
            next_attempt_at: now,
        }
    }

    /// Copy scheduled for the next attempt under tiered backoff:
    /// 2, 4, 8, 15, 30, 45, 60 seconds, then 90 from the eighth attempt on.
    pub fn with_retry(&self) -> Self {
        let next_attempts = self.attempts.saturating_add(1);
        let backoff_secs: i64 = match next_attempts {
            0 => 0,
            1 => 2,
            2 => 4,
            3 => 8,
            4 => 15,
            5 => 30,
            6 => 45,
            7 => 60,
            _ => 90,
        };

        // Deterministic ±10% jitter from the order id and attempt number,
        // so parallel confirmations spread out without a rand dependency
        let jitter = {
            use std::hash::{Hash, Hasher};
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            self.order_id.hash(&mut hasher);
            next_attempts.hash(&mut hasher);
            let h = hasher.finish();
            let sign = if (h & 1) == 0 { 1.0 } else { -1.0 };
            let frac = (((h >> 1) as f64) / ((u64::MAX >> 1) as f64)) * 0.1;
            ((backoff_secs as f64) * frac * sign) as i64
        };
        let backoff_with_jitter = std::cmp::max(1, backoff_secs + jitter);

        Self {
            order_id: self.order_id.clone(),
            position_uuid: self.position_uuid.clone(),
            kind: self.kind,
            attempts: next_attempts,
            enqueued_at: self.enqueued_at,
            next_attempt_at: Utc::now() + ChronoDuration::seconds(backoff_with_jitter),
        }
    }

    /// Expired entries are handed to the failure path. Entries time out on
    /// the configured per-kind deadline, and the attempts cap forces expiry
    /// even if the clock says otherwise.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        if self.attempts >= MAX_CONFIRM_ATTEMPTS {
            return true;
        }

        let timeout_secs = crate::config::with_config(|cfg| match self.kind {
            ConfirmKind::Entry => cfg.trading.entry_confirm_timeout_secs,
            ConfirmKind::Exit => cfg.trading.exit_confirm_timeout_secs,
        });

        now.signed_duration_since(self.enqueued_at).num_seconds() > timeout_secs
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_attempt_at
    }

    pub fn age_seconds(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.enqueued_at)
            .num_seconds()
    }
}

// =============================================================================
// QUEUE
// =============================================================================

pub struct ConfirmQueue {
    entries: VecDeque<ConfirmEntry>,
}

impl ConfirmQueue {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Push an entry unless its order id is already queued.
    pub fn enqueue(&mut self, entry: ConfirmEntry) {
        if !self.entries.iter().any(|e| e.order_id == entry.order_id) {
            self.entries.push_back(entry);
        }
    }

    /// Take up to `limit` due entries in arrival order; everything else
    /// stays queued.
    pub fn poll_due_batch(&mut self, limit: usize) -> Vec<ConfirmEntry> {
        let now = Utc::now();
        let mut batch = Vec::new();
        let mut remaining = VecDeque::with_capacity(self.entries.len());

        while let Some(entry) = self.entries.pop_front() {
            if batch.len() < limit && entry.is_due(now) {
                batch.push(entry);
            } else {
                remaining.push_back(entry);
            }
        }
        self.entries = remaining;

        batch
    }

    /// Re-queue with the attempt counter bumped and the next slot scheduled.
    pub fn requeue(&mut self, entry: ConfirmEntry) {
        self.entries.push_back(entry.with_retry());
    }

    pub fn remove(&mut self, order_id: &str) -> Option<ConfirmEntry> {
        let index = self.entries.iter().position(|e| e.order_id == order_id)?;
        self.entries.remove(index)
    }

    /// Drain everything past its deadline or attempts cap.
    pub fn gc_expired(&mut self) -> Vec<ConfirmEntry> {
        let now = Utc::now();
        let mut expired = Vec::new();
        let mut i = 0;

        while i < self.entries.len() {
            if self.entries[i].is_expired(now) {
                if let Some(entry) = self.entries.remove(i) {
                    expired.push(entry);
                }
            } else {
                i += 1;
            }
        }

        expired
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// =============================================================================
// GLOBAL QUEUE
// =============================================================================

static CONFIRM_QUEUE: LazyLock<RwLock<ConfirmQueue>> =
    LazyLock::new(|| RwLock::new(ConfirmQueue::new()));

pub async fn enqueue_confirmation(order_id: &str, position_uuid: &str, kind: ConfirmKind) {
    let entry = ConfirmEntry::new(order_id.to_string(), position_uuid.to_string(), kind);
    CONFIRM_QUEUE.write().await.enqueue(entry);
}

pub async fn poll_due_batch(limit: usize) -> Vec<ConfirmEntry> {
    CONFIRM_QUEUE.write().await.poll_due_batch(limit)
}

pub async fn requeue_confirmation(entry: ConfirmEntry) {
    CONFIRM_QUEUE.write().await.requeue(entry);
}

pub async fn remove_confirmation(order_id: &str) -> Option<ConfirmEntry> {
    CONFIRM_QUEUE.write().await.remove(order_id)
}

pub async fn gc_expired_confirmations() -> Vec<ConfirmEntry> {
    CONFIRM_QUEUE.write().await.gc_expired()
}

pub async fn queue_len() -> usize {
    CONFIRM_QUEUE.read().await.len()
}

#[cfg(test)]
pub async fn clear_queue() {
    CONFIRM_QUEUE.write().await.clear();
}
