//! Supplier request audit row — an immutable per-attempt log entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of a single outbound supplier call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupplierRequestOutcome {
    /// The supplier accepted the request.
    Success,
    /// The supplier rejected the request or returned an error.
    Failed,
    /// No response arrived before the deadline.
    Timeout,
}

/// An immutable audit row recording one outbound call to a supplier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupplierRequestAudit {
    /// Surrogate id, absent until persisted.
    pub id: Option<i64>,
    /// Reservation this call was made on behalf of.
    pub reservation_id: i64,
    /// Supplier being called.
    pub supplier_id: i64,
    /// What kind of call this was, e.g. `"create_reservation"`.
    pub request_kind: String,
    /// 1-based attempt number within the retry sequence.
    pub attempt: u32,
    /// How the call ended.
    pub outcome: SupplierRequestOutcome,
    /// HTTP status code, if the transport got that far.
    pub http_status: Option<u16>,
    /// Machine-readable error code, if any.
    pub error_code: Option<String>,
    /// Operator-readable error message, if any.
    pub error_message: Option<String>,
    /// Snapshot of the outbound request payload.
    pub request_payload: Value,
    /// Snapshot of the inbound response payload, if any arrived.
    pub response_payload: Option<Value>,
    /// Idempotency key sent with the call, if the supplier supports one.
    pub idempotency_key: Option<String>,
    /// When the attempt was recorded.
    pub created_at: DateTime<Utc>,
}

impl SupplierRequestAudit {
    /// Construct an audit row for a call that has already completed.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        reservation_id: i64,
        supplier_id: i64,
        request_kind: impl Into<String>,
        attempt: u32,
        outcome: SupplierRequestOutcome,
        request_payload: Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            reservation_id,
            supplier_id,
            request_kind: request_kind.into(),
            attempt,
            outcome,
            http_status: None,
            error_code: None,
            error_message: None,
            request_payload,
            response_payload: None,
            idempotency_key: None,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructs_with_sensible_defaults() {
        let now = DateTime::parse_from_rfc3339("2025-01-08T10:00:00Z").unwrap().into();
        let audit = SupplierRequestAudit::new(
            1,
            2,
            "create_reservation",
            1,
            SupplierRequestOutcome::Success,
            serde_json::json!({"foo": "bar"}),
            now,
        );
        assert_eq!(audit.attempt, 1);
        assert!(audit.response_payload.is_none());
    }
}
