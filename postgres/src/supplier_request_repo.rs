//! Postgres-backed [`SupplierRequestRepo`] — write-only audit log.

use crate::codec::to_db_str;
use crate::conn::SharedTx;
use crate::error::map_uow_err;
use rental_core::domain::SupplierRequestAudit;
use rental_core::ports::{SupplierRequestRepo, UnitOfWorkError};
use sqlx::Row;
use std::future::Future;
use std::pin::Pin;

/// Postgres-backed supplier-request audit log, scoped to a single
/// transaction.
pub struct PgSupplierRequestRepo {
    tx: SharedTx,
}

impl PgSupplierRequestRepo {
    /// Construct a repository handle sharing `tx` with the rest of a unit
    /// of work.
    #[must_use]
    pub const fn new(tx: SharedTx) -> Self {
        Self { tx }
    }
}

impl SupplierRequestRepo for PgSupplierRequestRepo {
    fn append<'a>(
        &'a mut self,
        audit: &'a SupplierRequestAudit,
    ) -> Pin<Box<dyn Future<Output = Result<i64, UnitOfWorkError>> + Send + 'a>> {
        Box::pin(async move {
            let mut guard = self.tx.lock().await;
            let row = sqlx::query(
                r"
                INSERT INTO reservation_supplier_requests (
                    reservation_id, supplier_id, request_kind, attempt, outcome, http_status,
                    error_code, error_message, request_payload, response_payload, idempotency_key,
                    created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                RETURNING id
                ",
            )
            .bind(audit.reservation_id)
            .bind(audit.supplier_id)
            .bind(&audit.request_kind)
            .bind(i32::try_from(audit.attempt).unwrap_or(i32::MAX))
            .bind(to_db_str(&audit.outcome))
            .bind(audit.http_status.map(i32::from))
            .bind(&audit.error_code)
            .bind(&audit.error_message)
            .bind(&audit.request_payload)
            .bind(&audit.response_payload)
            .bind(&audit.idempotency_key)
            .bind(audit.created_at)
            .fetch_one(&mut **guard)
            .await
            .map_err(map_uow_err)?;
            Ok(row.get("id"))
        })
    }
}
