//! Postgres-backed [`PaymentRepo`].

use crate::codec::{from_db_str, to_db_str};
use crate::conn::SharedTx;
use crate::error::map_uow_err;
use rental_core::domain::{Payment, PaymentStatus};
use rental_core::money::Money;
use rental_core::ports::{PaymentRepo, UnitOfWorkError};
use sqlx::Row;
use std::future::Future;
use std::pin::Pin;

/// Postgres-backed payment repository, scoped to a single transaction.
pub struct PgPaymentRepo {
    tx: SharedTx,
}

impl PgPaymentRepo {
    /// Construct a repository handle sharing `tx` with the rest of a unit
    /// of work.
    #[must_use]
    pub const fn new(tx: SharedTx) -> Self {
        Self { tx }
    }

    fn row_to_payment(row: &sqlx::postgres::PgRow) -> Result<Payment, UnitOfWorkError> {
        let status: String = row.get("status");
        Ok(Payment {
            id: row.get::<Option<i64>, _>("id"),
            reservation_id: row.get("reservation_id"),
            provider: row.get("provider"),
            provider_transaction_id: row.get("provider_transaction_id"),
            method: row.get("method"),
            amount: Money::from_cents(row.get("amount")),
            currency_code: row.get("currency_code"),
            status: from_db_str::<PaymentStatus>(&status).map_err(UnitOfWorkError::Backend)?,
            captured_at: row.get("captured_at"),
            refunded_at: row.get("refunded_at"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            stripe_payment_intent_id: row.get("stripe_payment_intent_id"),
            stripe_charge_id: row.get("stripe_charge_id"),
            stripe_event_id: row.get("stripe_event_id"),
            amount_refunded: Money::from_cents(row.get("amount_refunded")),
            fee_amount: row.get::<Option<i64>, _>("fee_amount").map(Money::from_cents),
            net_amount: row.get::<Option<i64>, _>("net_amount").map(Money::from_cents),
        })
    }
}

const SELECT_COLUMNS: &str = r"
    id, reservation_id, provider, provider_transaction_id, method, amount, currency_code,
    status, captured_at, refunded_at, created_at, updated_at, stripe_payment_intent_id,
    stripe_charge_id, stripe_event_id, amount_refunded, fee_amount, net_amount
";

impl PaymentRepo for PgPaymentRepo {
    fn get_by_id<'a>(
        &'a mut self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Payment>, UnitOfWorkError>> + Send + 'a>> {
        Box::pin(async move {
            let query = format!("SELECT {SELECT_COLUMNS} FROM payments WHERE id = $1");
            let mut guard = self.tx.lock().await;
            let row = sqlx::query(&query)
                .bind(id)
                .fetch_optional(&mut **guard)
                .await
                .map_err(map_uow_err)?;
            row.as_ref().map(Self::row_to_payment).transpose()
        })
    }

    fn get_by_reservation_id<'a>(
        &'a mut self,
        reservation_id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Payment>, UnitOfWorkError>> + Send + 'a>> {
        Box::pin(async move {
            let query = format!("SELECT {SELECT_COLUMNS} FROM payments WHERE reservation_id = $1 ORDER BY created_at ASC");
            let mut guard = self.tx.lock().await;
            let rows = sqlx::query(&query)
                .bind(reservation_id)
                .fetch_all(&mut **guard)
                .await
                .map_err(map_uow_err)?;
            rows.iter().map(Self::row_to_payment).collect()
        })
    }

    fn get_by_provider_intent<'a>(
        &'a mut self,
        provider_intent_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Payment>, UnitOfWorkError>> + Send + 'a>> {
        Box::pin(async move {
            let query = format!("SELECT {SELECT_COLUMNS} FROM payments WHERE stripe_payment_intent_id = $1");
            let mut guard = self.tx.lock().await;
            let row = sqlx::query(&query)
                .bind(provider_intent_id)
                .fetch_optional(&mut **guard)
                .await
                .map_err(map_uow_err)?;
            row.as_ref().map(Self::row_to_payment).transpose()
        })
    }

    fn save<'a>(
        &'a mut self,
        payment: &'a Payment,
    ) -> Pin<Box<dyn Future<Output = Result<i64, UnitOfWorkError>> + Send + 'a>> {
        Box::pin(async move {
            let mut guard = self.tx.lock().await;
            let row = sqlx::query(
                r"
                INSERT INTO payments (
                    reservation_id, provider, provider_transaction_id, method, amount, currency_code,
                    status, captured_at, refunded_at, stripe_payment_intent_id, stripe_charge_id,
                    stripe_event_id, amount_refunded, fee_amount, net_amount
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                RETURNING id
                ",
            )
            .bind(payment.reservation_id)
            .bind(&payment.provider)
            .bind(&payment.provider_transaction_id)
            .bind(&payment.method)
            .bind(payment.amount.cents())
            .bind(&payment.currency_code)
            .bind(to_db_str(&payment.status))
            .bind(payment.captured_at)
            .bind(payment.refunded_at)
            .bind(&payment.stripe_payment_intent_id)
            .bind(&payment.stripe_charge_id)
            .bind(&payment.stripe_event_id)
            .bind(payment.amount_refunded.cents())
            .bind(payment.fee_amount.map(Money::cents))
            .bind(payment.net_amount.map(Money::cents))
            .fetch_one(&mut **guard)
            .await
            .map_err(map_uow_err)?;
            Ok(row.get("id"))
        })
    }

    fn update<'a>(
        &'a mut self,
        payment: &'a Payment,
    ) -> Pin<Box<dyn Future<Output = Result<(), UnitOfWorkError>> + Send + 'a>> {
        Box::pin(async move {
            let id = payment.id.ok_or_else(|| UnitOfWorkError::NotFound {
                entity: "payment".to_string(),
                id: "<none>".to_string(),
            })?;
            let mut guard = self.tx.lock().await;
            let result = sqlx::query(
                r"
                UPDATE payments
                SET status = $2,
                    method = $3,
                    captured_at = $4,
                    refunded_at = $5,
                    stripe_charge_id = $6,
                    stripe_event_id = $7,
                    amount_refunded = $8,
                    fee_amount = $9,
                    net_amount = $10,
                    updated_at = now()
                WHERE id = $1
                ",
            )
            .bind(id)
            .bind(to_db_str(&payment.status))
            .bind(&payment.method)
            .bind(payment.captured_at)
            .bind(payment.refunded_at)
            .bind(&payment.stripe_charge_id)
            .bind(&payment.stripe_event_id)
            .bind(payment.amount_refunded.cents())
            .bind(payment.fee_amount.map(Money::cents))
            .bind(payment.net_amount.map(Money::cents))
            .execute(&mut **guard)
            .await
            .map_err(map_uow_err)?;

            if result.rows_affected() == 0 {
                return Err(UnitOfWorkError::NotFound {
                    entity: "payment".to_string(),
                    id: id.to_string(),
                });
            }
            Ok(())
        })
    }
}
