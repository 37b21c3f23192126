//! PostgreSQL adapters for the rental reservation orchestrator's ports.
//!
//! `sqlx` queries here are runtime-checked (`sqlx::query`/`query_as` with
//! manual `row.get`) rather than the compile-time `query!` macro, since this
//! crate carries no checked-in `.sqlx` offline cache and the macro otherwise
//! needs a live `DATABASE_URL` at build time.
//!
//! # Example
//!
//! ```ignore
//! use rental_postgres::{pool, unit_of_work::PgUnitOfWorkFactory};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = pool::connect("postgres://localhost/rental", 10).await?;
//!     pool::migrate(&pool).await?;
//!     let factory = PgUnitOfWorkFactory::new(pool);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog_repo;
pub mod codec;
pub mod conn;
pub mod error;
pub mod idempotency_store;
pub mod outbox_store;
pub mod payment_repo;
pub mod pool;
pub mod reservation_repo;
pub mod supplier_request_repo;
pub mod unit_of_work;

pub use catalog_repo::{PgCustomerRepo, PgOfficeRepo, PgSupplierRepo};
pub use conn::Conn;
pub use idempotency_store::PgIdempotencyStore;
pub use outbox_store::PgOutboxStore;
pub use payment_repo::PgPaymentRepo;
pub use reservation_repo::PgReservationRepo;
pub use supplier_request_repo::PgSupplierRequestRepo;
pub use unit_of_work::{PgUnitOfWork, PgUnitOfWorkFactory};
