//! # Rental Core
//!
//! Domain types, pure services and port traits for the car-rental reservation
//! orchestrator. Nothing in this crate performs I/O: it defines *what* the
//! orchestrator needs (state machine, pricing, code generation, the
//! `Reservation` aggregate and its children, and the port traits that
//! `rental-postgres` and `rental-gateways` implement), not how any of it
//! reaches a database or the network.
//!
//! ## Layout
//!
//! - [`money`] — fixed-point cents.
//! - [`state_machine`] — reservation status transitions (C1).
//! - [`code_generator`] — collision-free reservation codes (C2).
//! - [`pricing`] — rental pricing arithmetic (C3).
//! - [`idempotency`] — idempotency record shape and canonical hashing (C4).
//! - [`outbox`] — outbox event shape and store contract (C5).
//! - [`domain`] — the `Reservation` aggregate and its children/events.
//! - [`ports`] — `UnitOfWork`, `PaymentGateway`, `SupplierGateway` (C6–C8).
//! - [`environment`] — the `Clock` trait.
//! - [`error`] — the crate-wide error taxonomy (§7).

pub mod code_generator;
pub mod domain;
pub mod environment;
pub mod error;
pub mod events;
pub mod idempotency;
pub mod money;
pub mod outbox;
pub mod ports;
pub mod pricing;
pub mod state_machine;

pub use chrono::{DateTime, Utc};
pub use error::CoordinatorError;
pub use money::Money;
