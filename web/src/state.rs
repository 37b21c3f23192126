//! Application state shared across all HTTP handlers.

use rental_core::idempotency::IdempotencyStore;
use rental_core::ports::UnitOfWorkFactory;
use rental_runtime::{AvailabilityService, ReservationCommitCoordinator};
use std::sync::Arc;

/// Everything a handler needs to serve a request: the coordinator and
/// availability service from `rental-runtime`, the unit-of-work factory for
/// read-only lookups handlers perform directly (fetch/list), and the
/// idempotency store the edge layer consults before dispatching a write.
#[derive(Clone)]
pub struct AppState {
    /// Runs the booking protocol (C9).
    pub coordinator: Arc<ReservationCommitCoordinator>,
    /// Searches supplier availability.
    pub availability: Arc<AvailabilityService>,
    /// Backs `GET /reservations/{code}` and `GET /reservations?customer_id=`.
    pub uow_factory: Arc<dyn UnitOfWorkFactory>,
    /// Backs the `X-Idempotency-Key` edge-layer wrap around `POST /reservations`.
    pub idempotency: Arc<dyn IdempotencyStore>,
}

impl AppState {
    /// Build the shared application state from its collaborators.
    #[must_use]
    pub fn new(
        coordinator: Arc<ReservationCommitCoordinator>,
        availability: Arc<AvailabilityService>,
        uow_factory: Arc<dyn UnitOfWorkFactory>,
        idempotency: Arc<dyn IdempotencyStore>,
    ) -> Self {
        Self {
            coordinator,
            availability,
            uow_factory,
            idempotency,
        }
    }
}
