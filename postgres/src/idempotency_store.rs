//! Postgres-backed [`IdempotencyStore`].

use crate::conn::Conn;
use crate::error::map_idempotency_err;
use chrono::{DateTime, Utc};
use rental_core::idempotency::{IdempotencyRecord, IdempotencyStore, IdempotencyStoreError};
use serde_json::Value;
use sqlx::Row;
use std::future::Future;
use std::pin::Pin;

/// Postgres-backed idempotency store. Works either against a bare pool (the
/// cleanup sweep) or a unit of work's shared transaction (the coordinator's
/// `put` calls).
pub struct PgIdempotencyStore {
    conn: Conn,
}

impl PgIdempotencyStore {
    /// Construct an idempotency handle over `conn`.
    #[must_use]
    pub const fn new(conn: Conn) -> Self {
        Self { conn }
    }

    fn row_to_record(row: &sqlx::postgres::PgRow) -> IdempotencyRecord {
        let http_status: i32 = row.get("http_status");
        IdempotencyRecord {
            scope: row.get("scope"),
            idem_key: row.get("idem_key"),
            request_hash: row.get("request_hash"),
            response_body: row.get("response_body"),
            http_status: http_status.try_into().unwrap_or(u16::MAX),
            reference_id: row.get("reference_id"),
            created_at: row.get("created_at"),
        }
    }
}

impl IdempotencyStore for PgIdempotencyStore {
    fn get<'a>(
        &'a self,
        scope: &'a str,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<IdempotencyRecord>, IdempotencyStoreError>> + Send + 'a>> {
        Box::pin(async move {
            let query = sqlx::query(
                r"
                SELECT scope, idem_key, request_hash, response_body, http_status, reference_id, created_at
                FROM idempotency_keys
                WHERE scope = $1 AND idem_key = $2
                ",
            )
            .bind(scope)
            .bind(key);

            let row = match &self.conn {
                Conn::Pool(pool) => query.fetch_optional(pool).await,
                Conn::Tx(tx) => {
                    let mut guard = tx.lock().await;
                    query.fetch_optional(&mut **guard).await
                }
            }
            .map_err(|e| map_idempotency_err(e, scope))?;

            Ok(row.as_ref().map(Self::row_to_record))
        })
    }

    fn put<'a>(
        &'a self,
        scope: &'a str,
        key: &'a str,
        request_hash: &'a str,
        response_body: Value,
        http_status: u16,
        reference_id: Option<i64>,
    ) -> Pin<Box<dyn Future<Output = Result<(), IdempotencyStoreError>> + Send + 'a>> {
        Box::pin(async move {
            let query = sqlx::query(
                r"
                INSERT INTO idempotency_keys (scope, idem_key, request_hash, response_body, http_status, reference_id)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(scope)
            .bind(key)
            .bind(request_hash)
            .bind(response_body)
            .bind(i32::from(http_status))
            .bind(reference_id);

            match &self.conn {
                Conn::Pool(pool) => query.execute(pool).await,
                Conn::Tx(tx) => {
                    let mut guard = tx.lock().await;
                    query.execute(&mut **guard).await
                }
            }
            .map_err(|e| map_idempotency_err(e, scope))?;
            Ok(())
        })
    }

    fn complete<'a>(
        &'a self,
        scope: &'a str,
        key: &'a str,
        response_body: Value,
        http_status: u16,
        reference_id: Option<i64>,
    ) -> Pin<Box<dyn Future<Output = Result<(), IdempotencyStoreError>> + Send + 'a>> {
        Box::pin(async move {
            let query = sqlx::query(
                r"
                UPDATE idempotency_keys
                SET response_body = $3, http_status = $4, reference_id = $5
                WHERE scope = $1 AND idem_key = $2
                ",
            )
            .bind(scope)
            .bind(key)
            .bind(response_body)
            .bind(i32::from(http_status))
            .bind(reference_id);

            match &self.conn {
                Conn::Pool(pool) => query.execute(pool).await,
                Conn::Tx(tx) => {
                    let mut guard = tx.lock().await;
                    query.execute(&mut **guard).await
                }
            }
            .map_err(|e| map_idempotency_err(e, scope))?;
            Ok(())
        })
    }

    fn release<'a>(&'a self, scope: &'a str, key: &'a str) -> Pin<Box<dyn Future<Output = Result<(), IdempotencyStoreError>> + Send + 'a>> {
        Box::pin(async move {
            let query = sqlx::query("DELETE FROM idempotency_keys WHERE scope = $1 AND idem_key = $2")
                .bind(scope)
                .bind(key);

            match &self.conn {
                Conn::Pool(pool) => query.execute(pool).await,
                Conn::Tx(tx) => {
                    let mut guard = tx.lock().await;
                    query.execute(&mut **guard).await
                }
            }
            .map_err(|e| map_idempotency_err(e, scope))?;
            Ok(())
        })
    }

    fn cleanup<'a>(
        &'a self,
        older_than: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<u64, IdempotencyStoreError>> + Send + 'a>> {
        Box::pin(async move {
            let query = sqlx::query("DELETE FROM idempotency_keys WHERE created_at < $1").bind(older_than);

            let result = match &self.conn {
                Conn::Pool(pool) => query.execute(pool).await,
                Conn::Tx(tx) => {
                    let mut guard = tx.lock().await;
                    query.execute(&mut **guard).await
                }
            }
            .map_err(|e| map_idempotency_err(e, "cleanup"))?;

            Ok(result.rows_affected())
        })
    }
}
