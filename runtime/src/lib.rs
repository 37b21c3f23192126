//! Orchestration for the reservation booking protocol.
//!
//! Ports (`rental_core::ports`) and domain entities (`rental_core::domain`)
//! describe *what* a reservation is and *how* its invariants hold; this
//! crate describes *when* things happen — the exact sequencing of local
//! transactions and external calls that turns a booking request into a
//! confirmed, paid reservation, and the background loop that drains the
//! resulting outbox events.

pub mod availability;
pub mod coordinator;
pub mod dispatcher;
pub mod reconciliation;

pub use availability::{AvailabilityError, AvailabilityRequest, AvailabilityService};
pub use coordinator::{BookingRequest, BookingResult, CoordinatorConfig, DriverInput, ReservationCommitCoordinator};
pub use dispatcher::{OutboxDispatcher, OutboxEventHandler};
pub use reconciliation::{ReconciliationError, ReconciliationSweep, DEFAULT_STUCK_THRESHOLD};
