//! Postgres-backed [`OutboxStore`].
//!
//! `claim` uses `FOR UPDATE SKIP LOCKED` inside a CTE so that concurrent
//! dispatcher workers never contend for, or double-claim, the same row.

use crate::codec::to_db_str;
use crate::conn::Conn;
use crate::error::map_outbox_err;
use chrono::Utc;
use rental_core::outbox::{is_poisoned, next_attempt_at, OutboxEvent, OutboxStatus, OutboxStore, OutboxStoreError};
use serde_json::Value;
use sqlx::Row;
use std::future::Future;
use std::pin::Pin;

/// Postgres-backed outbox store. Works either against a bare pool (the
/// dispatcher's own claim loop) or a unit of work's shared transaction (the
/// coordinator's `append` calls).
pub struct PgOutboxStore {
    conn: Conn,
}

impl PgOutboxStore {
    /// Construct an outbox handle over `conn`.
    #[must_use]
    pub const fn new(conn: Conn) -> Self {
        Self { conn }
    }

    fn row_to_event(row: &sqlx::postgres::PgRow) -> Result<OutboxEvent, OutboxStoreError> {
        let status: String = row.get("status");
        let attempts: i32 = row.get("attempts");
        Ok(OutboxEvent {
            id: row.get("id"),
            event_type: row.get("event_type"),
            aggregate_type: row.get("aggregate_type"),
            aggregate_id: row.get("aggregate_id"),
            payload: row.get("payload"),
            status: crate::codec::from_db_str::<OutboxStatus>(&status).map_err(OutboxStoreError::Backend)?,
            attempts: attempts.unsigned_abs(),
            next_attempt_at: row.get("next_attempt_at"),
            locked_by: row.get("locked_by"),
            locked_at: row.get("locked_at"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

const CLAIM_QUERY: &str = r"
    WITH claimed AS (
        SELECT id FROM outbox_events
        WHERE status = 'NEW' AND (next_attempt_at IS NULL OR next_attempt_at <= now())
        ORDER BY created_at ASC
        LIMIT $1
        FOR UPDATE SKIP LOCKED
    )
    UPDATE outbox_events o
    SET status = 'DISPATCHING', locked_by = $2, locked_at = now()
    FROM claimed
    WHERE o.id = claimed.id
    RETURNING o.id, o.event_type, o.aggregate_type, o.aggregate_id, o.payload, o.status,
              o.attempts, o.next_attempt_at, o.locked_by, o.locked_at, o.created_at, o.updated_at
";

impl OutboxStore for PgOutboxStore {
    fn append<'a>(
        &'a self,
        event_type: &'a str,
        aggregate_type: &'a str,
        aggregate_id: i64,
        payload: Value,
    ) -> Pin<Box<dyn Future<Output = Result<i64, OutboxStoreError>> + Send + 'a>> {
        Box::pin(async move {
            let query = sqlx::query(
                r"
                INSERT INTO outbox_events (event_type, aggregate_type, aggregate_id, payload, status, attempts)
                VALUES ($1, $2, $3, $4, 'NEW', 0)
                RETURNING id
                ",
            )
            .bind(event_type)
            .bind(aggregate_type)
            .bind(aggregate_id)
            .bind(payload);

            let row = match &self.conn {
                Conn::Pool(pool) => query.fetch_one(pool).await,
                Conn::Tx(tx) => {
                    let mut guard = tx.lock().await;
                    query.fetch_one(&mut **guard).await
                }
            }
            .map_err(map_outbox_err)?;
            let id: i64 = row.get("id");
            metrics::counter!("outbox.appended", "event_type" => event_type.to_string()).increment(1);
            Ok(id)
        })
    }

    fn claim<'a>(
        &'a self,
        batch_size: u32,
        worker_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<OutboxEvent>, OutboxStoreError>> + Send + 'a>> {
        Box::pin(async move {
            let query = sqlx::query(CLAIM_QUERY).bind(i64::from(batch_size)).bind(worker_id);

            let rows = match &self.conn {
                Conn::Pool(pool) => query.fetch_all(pool).await,
                Conn::Tx(tx) => {
                    let mut guard = tx.lock().await;
                    query.fetch_all(&mut **guard).await
                }
            }
            .map_err(map_outbox_err)?;

            if !rows.is_empty() {
                tracing::debug!(worker_id, claimed = rows.len(), "claimed outbox events for dispatch");
            }
            rows.iter().map(Self::row_to_event).collect()
        })
    }

    fn mark_done<'a>(
        &'a self,
        id: i64,
        worker_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), OutboxStoreError>> + Send + 'a>> {
        Box::pin(async move {
            let query = sqlx::query(
                r"
                UPDATE outbox_events
                SET status = 'DONE', locked_by = NULL, locked_at = NULL, updated_at = now()
                WHERE id = $1 AND locked_by = $2
                ",
            )
            .bind(id)
            .bind(worker_id);

            let result = match &self.conn {
                Conn::Pool(pool) => query.execute(pool).await,
                Conn::Tx(tx) => {
                    let mut guard = tx.lock().await;
                    query.execute(&mut **guard).await
                }
            }
            .map_err(map_outbox_err)?;

            if result.rows_affected() == 0 {
                return Err(self.not_found_or_lock_mismatch(id, worker_id).await);
            }
            metrics::counter!("outbox.dispatched").increment(1);
            Ok(())
        })
    }

    fn mark_failed<'a>(
        &'a self,
        id: i64,
        worker_id: &'a str,
        error: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), OutboxStoreError>> + Send + 'a>> {
        Box::pin(async move {
            let current_attempts: i32 = {
                let query = sqlx::query("SELECT attempts FROM outbox_events WHERE id = $1 AND locked_by = $2")
                    .bind(id)
                    .bind(worker_id);
                let row = match &self.conn {
                    Conn::Pool(pool) => query.fetch_optional(pool).await,
                    Conn::Tx(tx) => {
                        let mut guard = tx.lock().await;
                        query.fetch_optional(&mut **guard).await
                    }
                }
                .map_err(map_outbox_err)?;
                match row {
                    Some(row) => row.get("attempts"),
                    None => return Err(self.not_found_or_lock_mismatch(id, worker_id).await),
                }
            };

            let attempts = current_attempts.unsigned_abs() + 1;
            let now = Utc::now();
            let status = if is_poisoned(attempts) {
                OutboxStatus::Failed
            } else {
                OutboxStatus::New
            };
            let next_attempt = next_attempt_at(attempts, now);

            let query = sqlx::query(
                r"
                UPDATE outbox_events
                SET status = $2,
                    attempts = $3,
                    next_attempt_at = $4,
                    locked_by = NULL,
                    locked_at = NULL,
                    last_error = $5,
                    updated_at = now()
                WHERE id = $1 AND locked_by = $6
                ",
            )
            .bind(id)
            .bind(to_db_str(&status))
            .bind(i32::try_from(attempts).unwrap_or(i32::MAX))
            .bind(next_attempt)
            .bind(error)
            .bind(worker_id);

            let result = match &self.conn {
                Conn::Pool(pool) => query.execute(pool).await,
                Conn::Tx(tx) => {
                    let mut guard = tx.lock().await;
                    query.execute(&mut **guard).await
                }
            }
            .map_err(map_outbox_err)?;

            if result.rows_affected() == 0 {
                return Err(self.not_found_or_lock_mismatch(id, worker_id).await);
            }

            if status == OutboxStatus::Failed {
                tracing::warn!(id, attempts, error, "outbox event exhausted retry budget");
                metrics::counter!("outbox.poisoned").increment(1);
            } else {
                tracing::debug!(id, attempts, error, "outbox dispatch attempt failed, will retry");
            }
            Ok(())
        })
    }
}

impl PgOutboxStore {
    /// Distinguish "no such row" from "row exists but isn't locked by
    /// `worker_id`" for a clearer error after a guarded update affects zero
    /// rows.
    async fn not_found_or_lock_mismatch(&self, id: i64, worker_id: &str) -> OutboxStoreError {
        let query = sqlx::query("SELECT 1 FROM outbox_events WHERE id = $1").bind(id);
        let exists = match &self.conn {
            Conn::Pool(pool) => query.fetch_optional(pool).await,
            Conn::Tx(tx) => {
                let mut guard = tx.lock().await;
                query.fetch_optional(&mut **guard).await
            }
        };
        match exists {
            Ok(Some(_)) => OutboxStoreError::LockMismatch { id, worker_id: worker_id.to_string() },
            Ok(None) => OutboxStoreError::NotFound { id },
            Err(err) => map_outbox_err(err),
        }
    }
}
