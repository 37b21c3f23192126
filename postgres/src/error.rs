//! Mapping from `sqlx::Error` to the port error taxonomies in `rental-core`.

use rental_core::idempotency::IdempotencyStoreError;
use rental_core::outbox::OutboxStoreError;
use rental_core::ports::UnitOfWorkError;

/// Map a generic `sqlx::Error` to a [`UnitOfWorkError`], recognizing a
/// unique-constraint violation as a [`UnitOfWorkError::Conflict`] rather
/// than an opaque backend error.
pub fn map_uow_err(err: sqlx::Error) -> UnitOfWorkError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return UnitOfWorkError::Conflict(db_err.message().to_string());
        }
    }
    UnitOfWorkError::Backend(err.to_string())
}

/// Map a generic `sqlx::Error` to an [`OutboxStoreError`].
pub fn map_outbox_err(err: sqlx::Error) -> OutboxStoreError {
    OutboxStoreError::Backend(err.to_string())
}

/// Map a generic `sqlx::Error` to an [`IdempotencyStoreError`], recognizing
/// a unique-constraint violation on `(scope, idem_key)` as
/// [`IdempotencyStoreError::AlreadyExists`].
pub fn map_idempotency_err(err: sqlx::Error, scope: &str) -> IdempotencyStoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return IdempotencyStoreError::AlreadyExists {
                scope: scope.to_string(),
            };
        }
    }
    IdempotencyStoreError::Backend(err.to_string())
}
