//! Postgres-backed [`UnitOfWork`] and [`UnitOfWorkFactory`].

use crate::catalog_repo::{PgCustomerRepo, PgOfficeRepo, PgSupplierRepo};
use crate::conn::{Conn, SharedTx};
use crate::outbox_store::PgOutboxStore;
use crate::payment_repo::PgPaymentRepo;
use crate::reservation_repo::PgReservationRepo;
use crate::supplier_request_repo::PgSupplierRequestRepo;
use rental_core::ports::{
    CustomerRepo, OfficeRepo, OutboxHandle, PaymentRepo, ReservationRepo, SupplierRepo, SupplierRequestRepo,
    UnitOfWork, UnitOfWorkError, UnitOfWorkFactory,
};
use sqlx::PgPool;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A single business transaction and the repository handles that share it.
pub struct PgUnitOfWork {
    tx: SharedTx,
    reservations: PgReservationRepo,
    payments: PgPaymentRepo,
    supplier_requests: PgSupplierRequestRepo,
    outbox: PgOutboxStore,
    customers: PgCustomerRepo,
    suppliers: PgSupplierRepo,
    offices: PgOfficeRepo,
}

impl PgUnitOfWork {
    fn new(tx: SharedTx) -> Self {
        Self {
            reservations: PgReservationRepo::new(tx.clone()),
            payments: PgPaymentRepo::new(tx.clone()),
            supplier_requests: PgSupplierRequestRepo::new(tx.clone()),
            outbox: PgOutboxStore::new(Conn::from_tx(tx.clone())),
            customers: PgCustomerRepo::new(Conn::from_tx(tx.clone())),
            suppliers: PgSupplierRepo::new(Conn::from_tx(tx.clone())),
            offices: PgOfficeRepo::new(Conn::from_tx(tx.clone())),
            tx,
        }
    }
}

impl UnitOfWork for PgUnitOfWork {
    fn reservations(&mut self) -> &mut dyn ReservationRepo {
        &mut self.reservations
    }

    fn payments(&mut self) -> &mut dyn PaymentRepo {
        &mut self.payments
    }

    fn supplier_requests(&mut self) -> &mut dyn SupplierRequestRepo {
        &mut self.supplier_requests
    }

    fn outbox(&mut self) -> &mut OutboxHandle {
        &mut self.outbox
    }

    fn customers(&mut self) -> &mut dyn CustomerRepo {
        &mut self.customers
    }

    fn suppliers(&mut self) -> &mut dyn SupplierRepo {
        &mut self.suppliers
    }

    fn offices(&mut self) -> &mut dyn OfficeRepo {
        &mut self.offices
    }

    fn commit(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<(), UnitOfWorkError>> + Send>> {
        Box::pin(async move {
            let tx = self.into_tx()?;
            tx.commit().await.map_err(crate::error::map_uow_err)?;
            metrics::counter!("unit_of_work.committed").increment(1);
            Ok(())
        })
    }

    fn rollback(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<(), UnitOfWorkError>> + Send>> {
        Box::pin(async move {
            let tx = self.into_tx()?;
            tx.rollback().await.map_err(crate::error::map_uow_err)?;
            tracing::debug!("unit of work rolled back");
            Ok(())
        })
    }
}

impl PgUnitOfWork {
    /// Drop every repository handle so the only surviving `Arc` to `tx` is
    /// this one, then unwrap it to get the bare transaction back.
    fn into_tx(self) -> Result<sqlx::Transaction<'static, sqlx::Postgres>, UnitOfWorkError> {
        let Self {
            tx,
            reservations,
            payments,
            supplier_requests,
            outbox,
            customers,
            suppliers,
            offices,
        } = self;
        drop(reservations);
        drop(payments);
        drop(supplier_requests);
        drop(outbox);
        drop(customers);
        drop(suppliers);
        drop(offices);

        Arc::try_unwrap(tx)
            .map_err(|_| UnitOfWorkError::Backend("transaction still shared by a live repository handle".to_string()))
            .map(Mutex::into_inner)
    }
}

/// Opens a [`PgUnitOfWork`] against a connection pool.
pub struct PgUnitOfWorkFactory {
    pool: PgPool,
}

impl PgUnitOfWorkFactory {
    /// Construct a factory over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl UnitOfWorkFactory for PgUnitOfWorkFactory {
    fn begin(&self) -> Pin<Box<dyn Future<Output = Result<Box<dyn UnitOfWork>, UnitOfWorkError>> + Send + '_>> {
        Box::pin(async move {
            let tx = self.pool.begin().await.map_err(crate::error::map_uow_err)?;
            let shared = Arc::new(Mutex::new(tx));
            let uow: Box<dyn UnitOfWork> = Box::new(PgUnitOfWork::new(shared));
            Ok(uow)
        })
    }
}
