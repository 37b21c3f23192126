//! HTTP API for the car-rental reservation orchestrator.
//!
//! This crate is the imperative shell around the core domain and runtime
//! crates: it parses and validates wire requests, dispatches them to the
//! booking coordinator or availability service, and maps domain errors onto
//! the HTTP error envelope described in the external interface.
//!
//! # Request flow
//!
//! 1. **HTTP request** arrives at an Axum handler under `/api/v1`.
//! 2. **Extract and validate** the request body/query into a typed DTO.
//! 3. **Convert** the DTO into a core/runtime request type
//!    (`BookingRequest`, `AvailabilityRequest`).
//! 4. **Call** the coordinator or availability service, which own all
//!    transactional and external-call behavior.
//! 5. **Map** the result (or error) onto a wire response.
//!
//! ```ignore
//! use rental_web::{router, AppState};
//!
//! let app = router(app_state);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{ClientIp, CorrelationId, UserAgent};
pub use middleware::{correlation_id_layer, CorrelationIdExt, CORRELATION_ID_HEADER};
pub use router::router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
