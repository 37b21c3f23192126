//! Shared connection handle.
//!
//! Most adapters in this crate need to run either against a bare pool (the
//! outbox dispatcher's own claim loop, the idempotency cleanup sweep) or
//! against the single transaction a [`crate::unit_of_work::PgUnitOfWork`]
//! hands out to every repository it owns. `Conn` is the seam between the
//! two: every adapter method matches on it once and picks the right
//! executor.

use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A transaction shared by every repository handle a single unit of work
/// hands out. `Arc<Mutex<_>>` rather than a bare `Transaction` because the
/// unit of work exposes `&mut dyn Trait` per repository concurrently, and
/// `Mutex<T>: Sync` regardless of whether `T` itself is `Sync` — exactly
/// what the dyn-compatible port traits require.
pub type SharedTx = Arc<Mutex<Transaction<'static, Postgres>>>;

/// Either a standalone pool or a transaction scoped to a unit of work.
#[derive(Clone)]
pub enum Conn {
    /// Unscoped pool access, used outside of any business transaction.
    Pool(PgPool),
    /// A transaction shared with the rest of a unit of work.
    Tx(SharedTx),
}

impl Conn {
    /// Wrap a bare pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self::Pool(pool)
    }

    /// Wrap a shared transaction.
    #[must_use]
    pub const fn from_tx(tx: SharedTx) -> Self {
        Self::Tx(tx)
    }
}
