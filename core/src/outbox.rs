//! Outbox event shape and store contract (C5).
//!
//! The outbox is the durable handoff between the coordinator (writer,
//! inside a business transaction) and the dispatcher (asynchronous
//! consumer). A row is only ever inserted as part of the transaction that
//! also persists the state change the event describes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Dispatch status of an outbox row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboxStatus {
    /// Not yet dispatched.
    New,
    /// Claimed by a worker and currently being handled. Excluded from
    /// `claim` so a second worker can never pick up a row while the first
    /// is still running its handler.
    Dispatching,
    /// Successfully handled by a consumer.
    Done,
    /// Exhausted its retry budget; a poison-queue terminal.
    Failed,
}

/// A durable event row awaiting dispatch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutboxEvent {
    /// Surrogate id.
    pub id: i64,
    /// Matches [`crate::events::DomainEvent::event_type`].
    pub event_type: String,
    /// Matches [`crate::events::DomainEvent::aggregate_type`].
    pub aggregate_type: String,
    /// Matches [`crate::events::DomainEvent::aggregate_id`].
    pub aggregate_id: i64,
    /// The event payload as it will be published downstream.
    pub payload: Value,
    /// Current dispatch status.
    pub status: OutboxStatus,
    /// Number of dispatch attempts made so far.
    pub attempts: u32,
    /// Earliest time the next attempt may run, `None` before any failure.
    pub next_attempt_at: Option<DateTime<Utc>>,
    /// Worker id that currently holds the claim lock, if any.
    pub locked_by: Option<String>,
    /// When the claim lock was taken, if any.
    pub locked_at: Option<DateTime<Utc>>,
    /// When the row was inserted.
    pub created_at: DateTime<Utc>,
    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Attempt budget before an outbox row becomes [`OutboxStatus::Failed`].
pub const MAX_DISPATCH_ATTEMPTS: u32 = 5;

/// Compute the next-attempt deadline for a failed dispatch: exponential
/// backoff of `2^attempts` minutes from `now`.
#[must_use]
pub fn next_attempt_at(attempts: u32, now: DateTime<Utc>) -> DateTime<Utc> {
    let minutes = 2_i64.saturating_pow(attempts);
    now + chrono::Duration::minutes(minutes)
}

/// Whether `attempts` has exhausted the retry budget.
#[must_use]
pub const fn is_poisoned(attempts: u32) -> bool {
    attempts >= MAX_DISPATCH_ATTEMPTS
}

/// Errors surfaced by an [`OutboxStore`] implementation.
#[derive(Error, Debug)]
pub enum OutboxStoreError {
    /// No row exists with the given id.
    #[error("outbox event {id} not found")]
    NotFound {
        /// The id that was looked up.
        id: i64,
    },
    /// The underlying storage failed.
    #[error("outbox store backend error: {0}")]
    Backend(String),
    /// The row exists but is not currently locked by the caller's
    /// `worker_id`, so the requested transition was refused.
    #[error("outbox event {id} is not locked by worker {worker_id}")]
    LockMismatch {
        /// The id that was looked up.
        id: i64,
        /// The worker id that attempted the transition.
        worker_id: String,
    },
}

/// Persistence contract for the outbox.
pub trait OutboxStore: Send + Sync {
    /// Insert a new row with `status = NEW, attempts = 0`. Must be called
    /// inside the same transaction as the state change the event describes.
    fn append<'a>(
        &'a self,
        event_type: &'a str,
        aggregate_type: &'a str,
        aggregate_id: i64,
        payload: Value,
    ) -> Pin<Box<dyn Future<Output = Result<i64, OutboxStoreError>> + Send + 'a>>;

    /// Atomically claim up to `batch_size` dispatchable rows (`status = NEW`
    /// and `next_attempt_at` either unset or past), ordered by `created_at`,
    /// transitioning them to `DISPATCHING` and stamping `locked_by`/
    /// `locked_at`. Implementations must guarantee no two concurrent workers
    /// are handed the same row, and that a claimed row is not eligible to be
    /// claimed again by anyone until `mark_done`/`mark_failed` moves it out
    /// of `DISPATCHING`.
    fn claim<'a>(
        &'a self,
        batch_size: u32,
        worker_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<OutboxEvent>, OutboxStoreError>> + Send + 'a>>;

    /// Mark a row dispatched successfully. Refuses with
    /// [`OutboxStoreError::LockMismatch`] unless the row is currently locked
    /// by `worker_id`.
    fn mark_done<'a>(
        &'a self,
        id: i64,
        worker_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), OutboxStoreError>> + Send + 'a>>;

    /// Mark a dispatch attempt failed: increments `attempts`, advances
    /// `next_attempt_at`, and transitions to `FAILED` once the retry budget
    /// is exhausted (back to `NEW` otherwise). Refuses with
    /// [`OutboxStoreError::LockMismatch`] unless the row is currently locked
    /// by `worker_id`.
    fn mark_failed<'a>(
        &'a self,
        id: i64,
        worker_id: &'a str,
        error: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), OutboxStoreError>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_each_attempt() {
        let now = DateTime::parse_from_rfc3339("2025-01-08T10:00:00Z").unwrap().into();
        assert_eq!(next_attempt_at(1, now) - now, chrono::Duration::minutes(2));
        assert_eq!(next_attempt_at(2, now) - now, chrono::Duration::minutes(4));
        assert_eq!(next_attempt_at(3, now) - now, chrono::Duration::minutes(8));
    }

    #[test]
    fn poison_threshold_matches_spec() {
        assert!(!is_poisoned(4));
        assert!(is_poisoned(5));
        assert!(is_poisoned(6));
    }
}
