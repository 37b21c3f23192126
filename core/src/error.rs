//! The crate-wide error taxonomy (spec §7).
//!
//! Every fallible operation in the coordinator, the ports, and the HTTP edge
//! ultimately reports one of these variants. Nothing past the boundary that
//! raised an error returns an opaque string.

use thiserror::Error;

/// The reason a payment charge did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentFailureReason {
    /// The card was declined or otherwise rejected by the issuer.
    #[error("card declined")]
    Card,
    /// The payment gateway itself reported an error (not the card).
    #[error("gateway error")]
    Gateway,
    /// The charge request was malformed.
    #[error("invalid charge request")]
    Validation,
    /// The gateway did not respond before the deadline.
    #[error("gateway timeout")]
    Timeout,
}

/// The unified error type returned by the coordinator and its collaborators.
#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// Malformed or semantically invalid request. HTTP 4xx, not retryable.
    #[error("validation error: {0}")]
    Validation(String),

    /// Lookup miss by reservation code or id. HTTP 404.
    #[error("reservation not found: {0}")]
    ReservationNotFound(String),

    /// An attempted status change is not a legal edge in the state machine.
    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// The status the reservation was in.
        from: String,
        /// The status the caller attempted to move to.
        to: String,
    },

    /// `lock_version` mismatch on an update. The coordinator may retry the
    /// enclosing read-modify-write once; a second failure becomes 409.
    #[error("optimistic concurrency conflict on {entity} {id}")]
    OptimisticConcurrency {
        /// Name of the entity being updated (e.g. "reservation").
        entity: String,
        /// Identifier of the row that failed to update.
        id: String,
    },

    /// Same idempotency key, different request hash. HTTP 409.
    #[error("conflicting idempotency key in scope {scope}")]
    ConflictingIdempotencyKey {
        /// The idempotency scope (operation family) the key belongs to.
        scope: String,
    },

    /// The same idempotency key is currently claimed by another in-flight
    /// request with the same request hash. HTTP 409; the caller should
    /// retry rather than treat this as a conflicting request.
    #[error("idempotency key in scope {scope} is claimed by an in-flight request")]
    IdempotencyKeyInProgress {
        /// The idempotency scope (operation family) the key belongs to.
        scope: String,
    },

    /// Charge did not succeed.
    #[error("payment failed: {reason}")]
    PaymentFailed {
        /// Why the charge failed.
        reason: PaymentFailureReason,
        /// Operator-readable detail from the gateway, if any.
        detail: Option<String>,
    },

    /// Supplier did not accept the booking.
    #[error("supplier confirmation failed (retryable: {retryable})")]
    SupplierConfirmationFailed {
        /// Whether the caller may retry the same booking attempt.
        retryable: bool,
        /// Operator-readable detail.
        detail: Option<String>,
    },

    /// Unknown outcome upstream (transport error, timeout). A reconciliation
    /// event is emitted by the caller; this variant only reports the fact.
    #[error("supplier call timed out")]
    SupplierTimeout,

    /// Last resort. Surfaced as 500 with a correlation id, never with
    /// internals.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoordinatorError {
    /// The machine-readable code for the HTTP error envelope (§6).
    #[must_use]
    pub fn machine_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::ReservationNotFound(_) => "RESERVATION_NOT_FOUND",
            Self::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            Self::OptimisticConcurrency { .. } => "OPTIMISTIC_CONCURRENCY",
            Self::ConflictingIdempotencyKey { .. } => "IDEMPOTENCY_CONFLICT",
            Self::IdempotencyKeyInProgress { .. } => "IDEMPOTENCY_IN_PROGRESS",
            Self::PaymentFailed { .. } => "PAYMENT_FAILED",
            Self::SupplierConfirmationFailed { .. } => "SUPPLIER_ERROR",
            Self::SupplierTimeout => "SUPPLIER_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn machine_codes_are_stable() {
        assert_eq!(
            CoordinatorError::Validation("x".into()).machine_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            CoordinatorError::PaymentFailed {
                reason: PaymentFailureReason::Card,
                detail: None
            }
            .machine_code(),
            "PAYMENT_FAILED"
        );
    }
}
