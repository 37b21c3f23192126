//! Unit of Work and repository port traits (C6).

use crate::domain::{Payment, Reservation, SupplierRequestAudit};
use crate::outbox::OutboxStore;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors surfaced by a [`UnitOfWork`] or its repositories.
#[derive(Error, Debug)]
pub enum UnitOfWorkError {
    /// No row matched the lookup.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity name, e.g. `"reservation"`.
        entity: String,
        /// The id or code that was looked up.
        id: String,
    },
    /// `lock_version` did not match on an update.
    #[error("optimistic concurrency conflict on {entity} {id}")]
    OptimisticConcurrency {
        /// Entity name.
        entity: String,
        /// The row's id.
        id: String,
    },
    /// A unique constraint was violated (e.g. duplicate reservation code).
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    /// The underlying storage failed.
    #[error("unit of work backend error: {0}")]
    Backend(String),
}

/// A read-only snapshot of a customer catalog row.
#[derive(Clone, Debug, PartialEq)]
pub struct CustomerRow {
    /// Surrogate id.
    pub id: i64,
    /// Full name on file.
    pub full_name: String,
    /// Email on file.
    pub email: String,
}

/// A read-only snapshot of a supplier catalog row.
#[derive(Clone, Debug, PartialEq)]
pub struct SupplierRow {
    /// Surrogate id.
    pub id: i64,
    /// Display name, copied into reservation snapshots at booking time.
    pub name: String,
}

/// A read-only snapshot of an office catalog row.
#[derive(Clone, Debug, PartialEq)]
pub struct OfficeRow {
    /// Surrogate id.
    pub id: i64,
    /// Office code, copied into reservation snapshots at booking time.
    pub code: String,
    /// Display name, copied into reservation snapshots at booking time.
    pub name: String,
    /// City name, copied into reservation snapshots at booking time.
    pub city_name: String,
    /// Country name, copied into reservation snapshots at booking time.
    pub country_name: String,
}

/// Repository contract for the reservation aggregate.
pub trait ReservationRepo: Send + Sync {
    /// Fetch by surrogate id.
    fn get_by_id<'a>(
        &'a mut self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Reservation>, UnitOfWorkError>> + Send + 'a>>;

    /// Fetch by public code.
    fn get_by_code<'a>(
        &'a mut self,
        code: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Reservation>, UnitOfWorkError>> + Send + 'a>>;

    /// Whether a row with `code` already exists.
    fn exists_by_code<'a>(
        &'a mut self,
        code: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, UnitOfWorkError>> + Send + 'a>>;

    /// Insert a new reservation along with its drivers, contacts, and
    /// pricing items. Returns the assigned surrogate id.
    fn save<'a>(
        &'a mut self,
        reservation: &'a Reservation,
    ) -> Pin<Box<dyn Future<Output = Result<i64, UnitOfWorkError>> + Send + 'a>>;

    /// Persist changes to an existing reservation, bumping `lock_version`.
    /// Fails with [`UnitOfWorkError::OptimisticConcurrency`] if the stored
    /// `lock_version` no longer matches `reservation.lock_version`.
    fn update<'a>(
        &'a mut self,
        reservation: &'a Reservation,
    ) -> Pin<Box<dyn Future<Output = Result<(), UnitOfWorkError>> + Send + 'a>>;

    /// List reservations for a customer, newest first.
    fn list_by_customer<'a>(
        &'a mut self,
        app_customer_id: i64,
        limit: u32,
        offset: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Reservation>, UnitOfWorkError>> + Send + 'a>>;

    /// List reservations whose pickup falls within `[from, to)`.
    fn list_by_date_range<'a>(
        &'a mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Reservation>, UnitOfWorkError>> + Send + 'a>>;

    /// Whether the `(category, supplier)` pair has no open reservation
    /// overlapping `[pickup, dropoff)`. Overlap: `existing.pickup <
    /// dropoff && existing.dropoff > pickup`, over reservations in
    /// `PENDING`, `ON_REQUEST`, or `CONFIRMED`.
    fn check_availability<'a>(
        &'a mut self,
        car_category_id: i64,
        supplier_id: i64,
        pickup: DateTime<Utc>,
        dropoff: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<bool, UnitOfWorkError>> + Send + 'a>>;

    /// Reservations that have been charged (`payment_status = PAID`) but
    /// are still in `PENDING`/`ON_REQUEST` and haven't been touched since
    /// before `updated_before` — the crash window between T2 and T3 (§4.9).
    fn list_paid_not_confirmed<'a>(
        &'a mut self,
        updated_before: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Reservation>, UnitOfWorkError>> + Send + 'a>>;
}

/// Repository contract for payments.
pub trait PaymentRepo: Send + Sync {
    /// Fetch by surrogate id.
    fn get_by_id<'a>(
        &'a mut self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Payment>, UnitOfWorkError>> + Send + 'a>>;

    /// Fetch all payments recorded against a reservation.
    fn get_by_reservation_id<'a>(
        &'a mut self,
        reservation_id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Payment>, UnitOfWorkError>> + Send + 'a>>;

    /// Fetch by the gateway's PaymentIntent id, for webhook correlation.
    fn get_by_provider_intent<'a>(
        &'a mut self,
        provider_intent_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Payment>, UnitOfWorkError>> + Send + 'a>>;

    /// Insert a new payment row. Returns the assigned surrogate id.
    fn save<'a>(
        &'a mut self,
        payment: &'a Payment,
    ) -> Pin<Box<dyn Future<Output = Result<i64, UnitOfWorkError>> + Send + 'a>>;

    /// Persist changes to an existing payment row.
    fn update<'a>(
        &'a mut self,
        payment: &'a Payment,
    ) -> Pin<Box<dyn Future<Output = Result<(), UnitOfWorkError>> + Send + 'a>>;
}

/// Write-only audit log of outbound supplier calls.
pub trait SupplierRequestRepo: Send + Sync {
    /// Append an immutable audit row.
    fn append<'a>(
        &'a mut self,
        audit: &'a SupplierRequestAudit,
    ) -> Pin<Box<dyn Future<Output = Result<i64, UnitOfWorkError>> + Send + 'a>>;
}

/// Read-only catalog lookup for registered customers.
pub trait CustomerRepo: Send + Sync {
    /// Fetch by surrogate id.
    fn get_by_id<'a>(
        &'a mut self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Option<CustomerRow>, UnitOfWorkError>> + Send + 'a>>;
}

/// Read-only catalog lookup for suppliers.
pub trait SupplierRepo: Send + Sync {
    /// Fetch by surrogate id.
    fn get_by_id<'a>(
        &'a mut self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Option<SupplierRow>, UnitOfWorkError>> + Send + 'a>>;
}

/// Read-only catalog lookup for offices.
pub trait OfficeRepo: Send + Sync {
    /// Fetch by surrogate id.
    fn get_by_id<'a>(
        &'a mut self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Option<OfficeRow>, UnitOfWorkError>> + Send + 'a>>;
}

/// The outbox handle exposed through a [`UnitOfWork`] — the same
/// [`OutboxStore`] contract, scoped to the current transaction.
pub type OutboxHandle = dyn OutboxStore;

/// Scoped acquisition of a database transaction with typed repository
/// handles. `commit`/`rollback` are the only ways to end it; dropping a
/// `UnitOfWork` without calling either implies rollback. Nested scopes are
/// not supported — the coordinator holds exactly one per booking.
pub trait UnitOfWork: Send {
    /// Reservation repository scoped to this transaction.
    fn reservations(&mut self) -> &mut dyn ReservationRepo;
    /// Payment repository scoped to this transaction.
    fn payments(&mut self) -> &mut dyn PaymentRepo;
    /// Supplier-request audit repository scoped to this transaction.
    fn supplier_requests(&mut self) -> &mut dyn SupplierRequestRepo;
    /// Outbox handle scoped to this transaction.
    fn outbox(&mut self) -> &mut OutboxHandle;
    /// Read-only customer catalog.
    fn customers(&mut self) -> &mut dyn CustomerRepo;
    /// Read-only supplier catalog.
    fn suppliers(&mut self) -> &mut dyn SupplierRepo;
    /// Read-only office catalog.
    fn offices(&mut self) -> &mut dyn OfficeRepo;

    /// Commit the transaction, consuming the unit of work.
    fn commit(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<(), UnitOfWorkError>> + Send>>;

    /// Roll back the transaction, consuming the unit of work.
    fn rollback(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<(), UnitOfWorkError>> + Send>>;
}

/// Opens a new [`UnitOfWork`], i.e. begins a database transaction.
pub trait UnitOfWorkFactory: Send + Sync {
    /// Begin a new transaction.
    fn begin(&self) -> Pin<Box<dyn Future<Output = Result<Box<dyn UnitOfWork>, UnitOfWorkError>> + Send + '_>>;
}
