//! In-memory [`UnitOfWork`]/[`UnitOfWorkFactory`] double.
//!
//! Every repository writes straight through to a shared, mutex-guarded
//! table rather than buffering until commit — there is no real isolation
//! or rollback here. That is a deliberate simplification for a test
//! double, not a production unit-of-work: `commit` and `rollback` exist
//! only to satisfy the trait's consuming signature.

use chrono::{DateTime, Utc};
use rental_core::domain::{Payment, PaymentStatus, Reservation, SupplierRequestAudit};
use rental_core::outbox::{self, OutboxEvent, OutboxStatus, OutboxStore, OutboxStoreError};
use rental_core::ports::{
    CustomerRepo, CustomerRow, OfficeRepo, OfficeRow, OutboxHandle, PaymentRepo, ReservationRepo, SupplierRepo,
    SupplierRequestRepo, SupplierRow, UnitOfWork, UnitOfWorkError, UnitOfWorkFactory,
};
use rental_core::state_machine::ReservationStatus;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

/// Shared state backing every [`UnitOfWork`] opened from the same
/// [`InMemoryUnitOfWorkFactory`].
#[derive(Default)]
pub struct InMemoryDb {
    customers: HashMap<i64, CustomerRow>,
    suppliers: HashMap<i64, SupplierRow>,
    offices: HashMap<i64, OfficeRow>,
    reservations: HashMap<i64, Reservation>,
    next_reservation_id: i64,
    payments: HashMap<i64, Payment>,
    next_payment_id: i64,
    supplier_requests: Vec<SupplierRequestAudit>,
    next_supplier_request_id: i64,
    outbox: Vec<OutboxEvent>,
    next_outbox_id: i64,
}

impl InMemoryDb {
    /// An empty store with no catalog rows.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a customer catalog row.
    pub fn insert_customer(&mut self, row: CustomerRow) {
        self.customers.insert(row.id, row);
    }

    /// Seed a supplier catalog row.
    pub fn insert_supplier(&mut self, row: SupplierRow) {
        self.suppliers.insert(row.id, row);
    }

    /// Seed an office catalog row.
    pub fn insert_office(&mut self, row: OfficeRow) {
        self.offices.insert(row.id, row);
    }

    /// Seed a reservation directly, bypassing `ReservationRepo::save`.
    /// Assigns a surrogate id if `reservation.id` is `None`.
    pub fn insert_reservation(&mut self, mut reservation: Reservation) -> i64 {
        let id = reservation.id.unwrap_or_else(|| {
            self.next_reservation_id += 1;
            self.next_reservation_id
        });
        reservation.id = Some(id);
        self.reservations.insert(id, reservation);
        id
    }

    /// Snapshot of every outbox row appended so far, in insertion order.
    #[must_use]
    pub fn outbox_events(&self) -> Vec<OutboxEvent> {
        self.outbox.clone()
    }

    /// Snapshot of every supplier-request audit row appended so far.
    #[must_use]
    pub fn supplier_request_audits(&self) -> Vec<SupplierRequestAudit> {
        self.supplier_requests.clone()
    }
}

/// Opens [`InMemoryUnitOfWork`]s over a shared [`InMemoryDb`].
pub struct InMemoryUnitOfWorkFactory {
    db: Arc<Mutex<InMemoryDb>>,
}

impl InMemoryUnitOfWorkFactory {
    /// A factory over a fresh, empty database.
    #[must_use]
    pub fn new() -> Self {
        Self { db: Arc::new(Mutex::new(InMemoryDb::new())) }
    }

    /// A factory over an already-seeded database.
    #[must_use]
    pub fn with_db(db: InMemoryDb) -> Self {
        Self { db: Arc::new(Mutex::new(db)) }
    }

    /// Direct access to the shared database, for seeding catalogs or
    /// asserting on what a test wrote.
    #[must_use]
    pub fn db(&self) -> Arc<Mutex<InMemoryDb>> {
        Arc::clone(&self.db)
    }
}

impl Default for InMemoryUnitOfWorkFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitOfWorkFactory for InMemoryUnitOfWorkFactory {
    fn begin(&self) -> Pin<Box<dyn Future<Output = Result<Box<dyn UnitOfWork>, UnitOfWorkError>> + Send + '_>> {
        let db = Arc::clone(&self.db);
        Box::pin(async move { Ok(Box::new(InMemoryUnitOfWork { db }) as Box<dyn UnitOfWork>) })
    }
}

struct InMemoryUnitOfWork {
    db: Arc<Mutex<InMemoryDb>>,
}

fn lock(db: &Mutex<InMemoryDb>) -> std::sync::MutexGuard<'_, InMemoryDb> {
    db.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl UnitOfWork for InMemoryUnitOfWork {
    fn reservations(&mut self) -> &mut dyn ReservationRepo {
        self
    }

    fn payments(&mut self) -> &mut dyn PaymentRepo {
        self
    }

    fn supplier_requests(&mut self) -> &mut dyn SupplierRequestRepo {
        self
    }

    fn outbox(&mut self) -> &mut OutboxHandle {
        self
    }

    fn customers(&mut self) -> &mut dyn CustomerRepo {
        self
    }

    fn suppliers(&mut self) -> &mut dyn SupplierRepo {
        self
    }

    fn offices(&mut self) -> &mut dyn OfficeRepo {
        self
    }

    fn commit(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<(), UnitOfWorkError>> + Send>> {
        Box::pin(async { Ok(()) })
    }

    fn rollback(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<(), UnitOfWorkError>> + Send>> {
        Box::pin(async { Ok(()) })
    }
}

impl ReservationRepo for InMemoryUnitOfWork {
    fn get_by_id<'a>(
        &'a mut self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Reservation>, UnitOfWorkError>> + Send + 'a>> {
        let db = Arc::clone(&self.db);
        Box::pin(async move { Ok(lock(&db).reservations.get(&id).cloned()) })
    }

    fn get_by_code<'a>(
        &'a mut self,
        code: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Reservation>, UnitOfWorkError>> + Send + 'a>> {
        let db = Arc::clone(&self.db);
        Box::pin(async move { Ok(lock(&db).reservations.values().find(|r| r.reservation_code == code).cloned()) })
    }

    fn exists_by_code<'a>(
        &'a mut self,
        code: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, UnitOfWorkError>> + Send + 'a>> {
        let db = Arc::clone(&self.db);
        Box::pin(async move { Ok(lock(&db).reservations.values().any(|r| r.reservation_code == code)) })
    }

    fn save<'a>(
        &'a mut self,
        reservation: &'a Reservation,
    ) -> Pin<Box<dyn Future<Output = Result<i64, UnitOfWorkError>> + Send + 'a>> {
        let db = Arc::clone(&self.db);
        let mut reservation = reservation.clone();
        Box::pin(async move {
            let mut db = lock(&db);
            db.next_reservation_id += 1;
            let id = db.next_reservation_id;
            reservation.id = Some(id);
            db.reservations.insert(id, reservation);
            Ok(id)
        })
    }

    fn update<'a>(
        &'a mut self,
        reservation: &'a Reservation,
    ) -> Pin<Box<dyn Future<Output = Result<(), UnitOfWorkError>> + Send + 'a>> {
        let db = Arc::clone(&self.db);
        let reservation = reservation.clone();
        Box::pin(async move {
            let Some(id) = reservation.id else {
                return Err(UnitOfWorkError::NotFound { entity: "reservation".to_string(), id: "<none>".to_string() });
            };
            let mut db = lock(&db);
            let Some(existing) = db.reservations.get(&id) else {
                return Err(UnitOfWorkError::NotFound { entity: "reservation".to_string(), id: id.to_string() });
            };
            if existing.lock_version != reservation.lock_version {
                return Err(UnitOfWorkError::OptimisticConcurrency { entity: "reservation".to_string(), id: id.to_string() });
            }
            let mut updated = reservation;
            updated.lock_version += 1;
            db.reservations.insert(id, updated);
            Ok(())
        })
    }

    fn list_by_customer<'a>(
        &'a mut self,
        app_customer_id: i64,
        limit: u32,
        offset: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Reservation>, UnitOfWorkError>> + Send + 'a>> {
        let db = Arc::clone(&self.db);
        Box::pin(async move {
            let db = lock(&db);
            let mut matches: Vec<Reservation> =
                db.reservations.values().filter(|r| r.app_customer_id == Some(app_customer_id)).cloned().collect();
            matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(matches.into_iter().skip(offset as usize).take(limit as usize).collect())
        })
    }

    fn list_by_date_range<'a>(
        &'a mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Reservation>, UnitOfWorkError>> + Send + 'a>> {
        let db = Arc::clone(&self.db);
        Box::pin(async move {
            let db = lock(&db);
            Ok(db.reservations.values().filter(|r| r.pickup_datetime >= from && r.pickup_datetime < to).cloned().collect())
        })
    }

    fn check_availability<'a>(
        &'a mut self,
        car_category_id: i64,
        supplier_id: i64,
        pickup: DateTime<Utc>,
        dropoff: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<bool, UnitOfWorkError>> + Send + 'a>> {
        let db = Arc::clone(&self.db);
        Box::pin(async move {
            let db = lock(&db);
            let collides = db.reservations.values().any(|r| {
                r.car_category_id == car_category_id
                    && r.supplier_id == supplier_id
                    && matches!(r.status, ReservationStatus::Pending | ReservationStatus::OnRequest | ReservationStatus::Confirmed)
                    && r.pickup_datetime < dropoff
                    && r.dropoff_datetime > pickup
            });
            Ok(!collides)
        })
    }

    fn list_paid_not_confirmed<'a>(
        &'a mut self,
        updated_before: DateTime<Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Reservation>, UnitOfWorkError>> + Send + 'a>> {
        let db = Arc::clone(&self.db);
        Box::pin(async move {
            let db = lock(&db);
            Ok(db
                .reservations
                .values()
                .filter(|r| {
                    r.payment_status == PaymentStatus::Paid
                        && matches!(r.status, ReservationStatus::Pending | ReservationStatus::OnRequest)
                        && r.updated_at < updated_before
                })
                .cloned()
                .collect())
        })
    }
}

impl PaymentRepo for InMemoryUnitOfWork {
    fn get_by_id<'a>(
        &'a mut self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Payment>, UnitOfWorkError>> + Send + 'a>> {
        let db = Arc::clone(&self.db);
        Box::pin(async move { Ok(lock(&db).payments.get(&id).cloned()) })
    }

    fn get_by_reservation_id<'a>(
        &'a mut self,
        reservation_id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Payment>, UnitOfWorkError>> + Send + 'a>> {
        let db = Arc::clone(&self.db);
        Box::pin(async move { Ok(lock(&db).payments.values().filter(|p| p.reservation_id == reservation_id).cloned().collect()) })
    }

    fn get_by_provider_intent<'a>(
        &'a mut self,
        provider_intent_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Payment>, UnitOfWorkError>> + Send + 'a>> {
        let db = Arc::clone(&self.db);
        Box::pin(async move {
            Ok(lock(&db).payments.values().find(|p| p.stripe_payment_intent_id.as_deref() == Some(provider_intent_id)).cloned())
        })
    }

    fn save<'a>(
        &'a mut self,
        payment: &'a Payment,
    ) -> Pin<Box<dyn Future<Output = Result<i64, UnitOfWorkError>> + Send + 'a>> {
        let db = Arc::clone(&self.db);
        let mut payment = payment.clone();
        Box::pin(async move {
            let mut db = lock(&db);
            db.next_payment_id += 1;
            let id = db.next_payment_id;
            payment.id = Some(id);
            db.payments.insert(id, payment);
            Ok(id)
        })
    }

    fn update<'a>(
        &'a mut self,
        payment: &'a Payment,
    ) -> Pin<Box<dyn Future<Output = Result<(), UnitOfWorkError>> + Send + 'a>> {
        let db = Arc::clone(&self.db);
        let payment = payment.clone();
        Box::pin(async move {
            let Some(id) = payment.id else {
                return Err(UnitOfWorkError::NotFound { entity: "payment".to_string(), id: "<none>".to_string() });
            };
            lock(&db).payments.insert(id, payment);
            Ok(())
        })
    }
}

impl SupplierRequestRepo for InMemoryUnitOfWork {
    fn append<'a>(
        &'a mut self,
        audit: &'a SupplierRequestAudit,
    ) -> Pin<Box<dyn Future<Output = Result<i64, UnitOfWorkError>> + Send + 'a>> {
        let db = Arc::clone(&self.db);
        let audit = audit.clone();
        Box::pin(async move {
            let mut db = lock(&db);
            db.next_supplier_request_id += 1;
            let id = db.next_supplier_request_id;
            db.supplier_requests.push(audit);
            Ok(id)
        })
    }
}

impl CustomerRepo for InMemoryUnitOfWork {
    fn get_by_id<'a>(
        &'a mut self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Option<CustomerRow>, UnitOfWorkError>> + Send + 'a>> {
        let db = Arc::clone(&self.db);
        Box::pin(async move { Ok(lock(&db).customers.get(&id).cloned()) })
    }
}

impl SupplierRepo for InMemoryUnitOfWork {
    fn get_by_id<'a>(
        &'a mut self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Option<SupplierRow>, UnitOfWorkError>> + Send + 'a>> {
        let db = Arc::clone(&self.db);
        Box::pin(async move { Ok(lock(&db).suppliers.get(&id).cloned()) })
    }
}

impl OfficeRepo for InMemoryUnitOfWork {
    fn get_by_id<'a>(
        &'a mut self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Option<OfficeRow>, UnitOfWorkError>> + Send + 'a>> {
        let db = Arc::clone(&self.db);
        Box::pin(async move { Ok(lock(&db).offices.get(&id).cloned()) })
    }
}

impl OutboxStore for InMemoryUnitOfWork {
    fn append<'a>(
        &'a self,
        event_type: &'a str,
        aggregate_type: &'a str,
        aggregate_id: i64,
        payload: Value,
    ) -> Pin<Box<dyn Future<Output = Result<i64, OutboxStoreError>> + Send + 'a>> {
        let db = Arc::clone(&self.db);
        let event_type = event_type.to_string();
        let aggregate_type = aggregate_type.to_string();
        Box::pin(async move {
            let mut db = lock(&db);
            db.next_outbox_id += 1;
            let id = db.next_outbox_id;
            let now = Utc::now();
            db.outbox.push(OutboxEvent {
                id,
                event_type,
                aggregate_type,
                aggregate_id,
                payload,
                status: OutboxStatus::New,
                attempts: 0,
                next_attempt_at: None,
                locked_by: None,
                locked_at: None,
                created_at: now,
                updated_at: now,
            });
            Ok(id)
        })
    }

    fn claim<'a>(
        &'a self,
        batch_size: u32,
        worker_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<OutboxEvent>, OutboxStoreError>> + Send + 'a>> {
        let db = Arc::clone(&self.db);
        let worker_id = worker_id.to_string();
        Box::pin(async move {
            let mut db = lock(&db);
            let now = Utc::now();
            let mut claimed = Vec::new();
            let mut rows: Vec<&mut OutboxEvent> = db
                .outbox
                .iter_mut()
                .filter(|e| e.status == OutboxStatus::New && e.next_attempt_at.is_none_or(|at| at <= now))
                .collect();
            rows.sort_by_key(|e| e.created_at);
            for row in rows.into_iter().take(batch_size as usize) {
                row.status = OutboxStatus::Dispatching;
                row.locked_by = Some(worker_id.clone());
                row.locked_at = Some(now);
                row.updated_at = now;
                claimed.push(row.clone());
            }
            Ok(claimed)
        })
    }

    fn mark_done<'a>(
        &'a self,
        id: i64,
        worker_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), OutboxStoreError>> + Send + 'a>> {
        let db = Arc::clone(&self.db);
        let worker_id = worker_id.to_string();
        Box::pin(async move {
            let mut db = lock(&db);
            let row = db.outbox.iter_mut().find(|e| e.id == id).ok_or(OutboxStoreError::NotFound { id })?;
            if row.locked_by.as_deref() != Some(worker_id.as_str()) {
                return Err(OutboxStoreError::LockMismatch { id, worker_id });
            }
            row.status = OutboxStatus::Done;
            row.locked_by = None;
            row.locked_at = None;
            row.updated_at = Utc::now();
            Ok(())
        })
    }

    fn mark_failed<'a>(
        &'a self,
        id: i64,
        worker_id: &'a str,
        error: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), OutboxStoreError>> + Send + 'a>> {
        let db = Arc::clone(&self.db);
        let worker_id = worker_id.to_string();
        let error = error.to_string();
        Box::pin(async move {
            let mut db = lock(&db);
            let now = Utc::now();
            let row = db.outbox.iter_mut().find(|e| e.id == id).ok_or(OutboxStoreError::NotFound { id })?;
            if row.locked_by.as_deref() != Some(worker_id.as_str()) {
                return Err(OutboxStoreError::LockMismatch { id, worker_id });
            }
            row.attempts += 1;
            row.status = if outbox::is_poisoned(row.attempts) { OutboxStatus::Failed } else { OutboxStatus::New };
            row.next_attempt_at = Some(outbox::next_attempt_at(row.attempts, now));
            row.locked_by = None;
            row.locked_at = None;
            row.updated_at = now;
            tracing::debug!(event_id = id, attempts = row.attempts, error, "outbox dispatch attempt failed");
            Ok(())
        })
    }
}
