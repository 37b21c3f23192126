//! Read-only catalog repositories: customers, suppliers, offices.
//!
//! Unlike the reservation/payment/supplier-request repos these are read-only
//! and only ever need pool access, never a shared transaction — a catalog
//! lookup inside a unit of work still reads the same committed row a bare
//! pool connection would see.

use crate::conn::Conn;
use crate::error::map_uow_err;
use rental_core::ports::{CustomerRepo, CustomerRow, OfficeRepo, OfficeRow, SupplierRepo, SupplierRow, UnitOfWorkError};
use sqlx::Row;
use std::future::Future;
use std::pin::Pin;

async fn fetch_optional(conn: &Conn, query: &str, id: i64) -> Result<Option<sqlx::postgres::PgRow>, sqlx::Error> {
    match conn {
        Conn::Pool(pool) => sqlx::query(query).bind(id).fetch_optional(pool).await,
        Conn::Tx(tx) => {
            let mut guard = tx.lock().await;
            sqlx::query(query).bind(id).fetch_optional(&mut **guard).await
        }
    }
}

/// Read-only customer catalog, backed by `app_customers`.
pub struct PgCustomerRepo {
    conn: Conn,
}

impl PgCustomerRepo {
    /// Construct a catalog handle over `conn`.
    #[must_use]
    pub const fn new(conn: Conn) -> Self {
        Self { conn }
    }
}

impl CustomerRepo for PgCustomerRepo {
    fn get_by_id<'a>(
        &'a mut self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Option<CustomerRow>, UnitOfWorkError>> + Send + 'a>> {
        Box::pin(async move {
            let row = fetch_optional(&self.conn, "SELECT id, full_name, email FROM app_customers WHERE id = $1", id)
                .await
                .map_err(map_uow_err)?;
            Ok(row.map(|row| CustomerRow {
                id: row.get("id"),
                full_name: row.get("full_name"),
                email: row.get("email"),
            }))
        })
    }
}

/// Read-only supplier catalog, backed by `suppliers`.
pub struct PgSupplierRepo {
    conn: Conn,
}

impl PgSupplierRepo {
    /// Construct a catalog handle over `conn`.
    #[must_use]
    pub const fn new(conn: Conn) -> Self {
        Self { conn }
    }
}

impl SupplierRepo for PgSupplierRepo {
    fn get_by_id<'a>(
        &'a mut self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Option<SupplierRow>, UnitOfWorkError>> + Send + 'a>> {
        Box::pin(async move {
            let row = fetch_optional(&self.conn, "SELECT id, name FROM suppliers WHERE id = $1", id)
                .await
                .map_err(map_uow_err)?;
            Ok(row.map(|row| SupplierRow {
                id: row.get("id"),
                name: row.get("name"),
            }))
        })
    }
}

/// Read-only office catalog, backed by `offices` joined to `cities`/`countries`.
pub struct PgOfficeRepo {
    conn: Conn,
}

impl PgOfficeRepo {
    /// Construct a catalog handle over `conn`.
    #[must_use]
    pub const fn new(conn: Conn) -> Self {
        Self { conn }
    }
}

const OFFICE_QUERY: &str = r"
    SELECT o.id, o.code, o.name, c.name AS city_name, co.name AS country_name
    FROM offices o
    JOIN cities c ON c.id = o.city_id
    JOIN countries co ON co.id = c.country_id
    WHERE o.id = $1
";

impl OfficeRepo for PgOfficeRepo {
    fn get_by_id<'a>(
        &'a mut self,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<Option<OfficeRow>, UnitOfWorkError>> + Send + 'a>> {
        Box::pin(async move {
            let row = fetch_optional(&self.conn, OFFICE_QUERY, id).await.map_err(map_uow_err)?;
            Ok(row.map(|row| OfficeRow {
                id: row.get("id"),
                code: row.get("code"),
                name: row.get("name"),
                city_name: row.get("city_name"),
                country_name: row.get("country_name"),
            }))
        })
    }
}
