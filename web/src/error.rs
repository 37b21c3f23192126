//! Error types for web handlers.
//!
//! Bridges [`rental_core::error::CoordinatorError`] and
//! [`rental_runtime::AvailabilityError`] to the uniform HTTP error envelope:
//! `{"error": <Kind>, "message": <str>, "code": <MACHINE_CODE>, "details"?: {...}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rental_core::error::{CoordinatorError, PaymentFailureReason};
use rental_core::idempotency::IdempotencyStoreError;
use rental_core::ports::UnitOfWorkError;
use rental_runtime::AvailabilityError;
use serde::Serialize;
use serde_json::Value;

/// Application error type for web handlers, rendered uniformly by
/// [`IntoResponse`].
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    /// `Kind` in the error envelope — the typed error name from §7.
    error: &'static str,
    message: String,
    /// `MACHINE_CODE` in the envelope.
    code: &'static str,
    details: Option<Value>,
}

impl AppError {
    /// Construct an error with no `details` payload.
    #[must_use]
    pub fn new(status: StatusCode, error: &'static str, message: String, code: &'static str) -> Self {
        Self {
            status,
            error,
            message,
            code,
            details: None,
        }
    }

    /// Attach a `details` payload to the envelope.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// 400 Bad Request — malformed request, rejected before touching any port.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "ValidationError", message.into(), "VALIDATION_ERROR")
    }

    /// 404 when an availability search's offers come back empty.
    #[must_use]
    pub fn no_offers() -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "NoOffersFound",
            "no offers matched the requested search".to_string(),
            "NO_OFFERS_FOUND",
        )
    }

    /// 500 Internal Server Error, with a correlation id and no internals.
    #[must_use]
    pub fn internal(correlation_id: impl std::fmt::Display) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal",
            format!("an internal error occurred (correlation id {correlation_id})"),
            "INTERNAL_ERROR",
        )
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, code = self.code, message = %self.message, "internal server error");
        }

        let body = ErrorResponse {
            error: self.error,
            message: self.message,
            code: self.code,
            details: self.details,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<CoordinatorError> for AppError {
    fn from(err: CoordinatorError) -> Self {
        let code = err.machine_code();
        match err {
            CoordinatorError::Validation(detail) => Self::new(StatusCode::UNPROCESSABLE_ENTITY, "ValidationError", detail, code),
            CoordinatorError::ReservationNotFound(detail) => {
                Self::new(StatusCode::NOT_FOUND, "ReservationNotFound", detail, code)
            }
            CoordinatorError::InvalidStateTransition { from, to } => Self::new(
                StatusCode::CONFLICT,
                "InvalidStateTransition",
                format!("cannot move from {from} to {to}"),
                code,
            ),
            CoordinatorError::OptimisticConcurrency { entity, id } => Self::new(
                StatusCode::CONFLICT,
                "OptimisticConcurrency",
                format!("{entity} {id} was updated concurrently"),
                code,
            ),
            CoordinatorError::ConflictingIdempotencyKey { scope } => Self::new(
                StatusCode::CONFLICT,
                "ConflictingIdempotencyKey",
                format!("idempotency key reused with a different request in scope {scope}"),
                code,
            ),
            CoordinatorError::IdempotencyKeyInProgress { scope } => Self::new(
                StatusCode::CONFLICT,
                "IdempotencyKeyInProgress",
                format!("a request with this idempotency key is already in flight in scope {scope}"),
                code,
            ),
            CoordinatorError::PaymentFailed { reason, detail } => {
                let status = match reason {
                    PaymentFailureReason::Card | PaymentFailureReason::Validation => StatusCode::PAYMENT_REQUIRED,
                    PaymentFailureReason::Gateway => StatusCode::BAD_GATEWAY,
                    PaymentFailureReason::Timeout => StatusCode::SERVICE_UNAVAILABLE,
                };
                let message = detail.unwrap_or_else(|| reason.to_string());
                Self::new(status, "PaymentFailed", message, code).with_details(serde_json::json!({ "reason": reason.to_string() }))
            }
            CoordinatorError::SupplierConfirmationFailed { retryable, detail } => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "SupplierConfirmationFailed",
                detail.unwrap_or_else(|| "supplier did not confirm the booking".to_string()),
                code,
            )
            .with_details(serde_json::json!({ "retryable": retryable })),
            CoordinatorError::SupplierTimeout => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "SupplierTimeout",
                "the supplier call did not complete before the deadline".to_string(),
                code,
            ),
            CoordinatorError::Internal(_) => Self::internal(uuid::Uuid::new_v4()),
        }
    }
}

impl From<AvailabilityError> for AppError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::Validation(detail) => Self::bad_request(detail),
            AvailabilityError::UnknownSupplier(id) => {
                Self::bad_request(format!("supplier {id} is not configured"))
            }
            AvailabilityError::AllSuppliersUnreachable => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "SupplierUnreachable",
                "no supplier could be reached".to_string(),
                "SUPPLIER_ERROR",
            ),
            AvailabilityError::UnitOfWork(err) => Self::from(err),
        }
    }
}

impl From<UnitOfWorkError> for AppError {
    fn from(err: UnitOfWorkError) -> Self {
        match err {
            UnitOfWorkError::NotFound { entity, id } => {
                Self::new(StatusCode::NOT_FOUND, "ReservationNotFound", format!("{entity} {id} not found"), "RESERVATION_NOT_FOUND")
            }
            UnitOfWorkError::OptimisticConcurrency { entity, id } => Self::new(
                StatusCode::CONFLICT,
                "OptimisticConcurrency",
                format!("{entity} {id} was updated concurrently"),
                "OPTIMISTIC_CONCURRENCY",
            ),
            UnitOfWorkError::Conflict(detail) => Self::new(StatusCode::CONFLICT, "ValidationError", detail, "VALIDATION_ERROR"),
            UnitOfWorkError::Backend(_) => Self::internal(uuid::Uuid::new_v4()),
        }
    }
}

impl From<IdempotencyStoreError> for AppError {
    fn from(_err: IdempotencyStoreError) -> Self {
        Self::internal(uuid::Uuid::new_v4())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_failed_card_maps_to_402() {
        let err = AppError::from(CoordinatorError::PaymentFailed {
            reason: PaymentFailureReason::Card,
            detail: Some("card_declined".to_string()),
        });
        assert_eq!(err.status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(err.code, "PAYMENT_FAILED");
    }

    #[test]
    fn reservation_not_found_maps_to_404() {
        let err = AppError::from(CoordinatorError::ReservationNotFound("RES-X".to_string()));
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn idempotency_key_in_progress_maps_to_409() {
        let err = AppError::from(CoordinatorError::IdempotencyKeyInProgress { scope: "create_reservation".to_string() });
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.code, "IDEMPOTENCY_IN_PROGRESS");
    }

    #[test]
    fn supplier_confirmation_failed_maps_to_503_with_retryable_detail() {
        let err = AppError::from(CoordinatorError::SupplierConfirmationFailed {
            retryable: true,
            detail: Some("timed out".to_string()),
        });
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.details, Some(serde_json::json!({ "retryable": true })));
    }
}
