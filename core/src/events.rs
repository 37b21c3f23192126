//! Domain events.
//!
//! Events are accumulated on the aggregate and drained into the outbox in
//! the same transaction that makes them durable (§4.9). Each variant knows
//! its own outbox `event_type` and `aggregate_type` so that the coordinator
//! never hand-writes those strings at the call site.

use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reservation was created locally (status `PENDING`, payment `UNPAID`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReservationCreated {
    /// Surrogate id, set once the reservation row exists.
    pub aggregate_id: i64,
    /// Public reservation code.
    pub reservation_code: String,
    /// Scheduled pickup time.
    pub pickup_datetime: DateTime<Utc>,
    /// Total public price at booking time.
    pub total_amount: Money,
    /// ISO-4217 currency code.
    pub currency_code: String,
    /// When the event was recorded.
    pub occurred_at: DateTime<Utc>,
}

/// A reservation was confirmed by the supplier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReservationConfirmed {
    /// Reservation surrogate id.
    pub aggregate_id: i64,
    /// Public reservation code.
    pub reservation_code: String,
    /// Confirmation number assigned by the supplier.
    pub supplier_reservation_code: String,
    /// Supplier display name at booking time.
    pub supplier_name: String,
    /// Booker's email, for downstream notification.
    pub customer_email: String,
    /// When the event was recorded.
    pub occurred_at: DateTime<Utc>,
}

/// Payment for a reservation completed successfully.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentCompleted {
    /// Reservation surrogate id.
    pub aggregate_id: i64,
    /// Public reservation code.
    pub reservation_code: String,
    /// Payment row id.
    pub payment_id: i64,
    /// Amount captured.
    pub amount: Money,
    /// ISO-4217 currency code.
    pub currency_code: String,
    /// When the event was recorded.
    pub occurred_at: DateTime<Utc>,
}

/// Payment succeeded but the supplier did not confirm; the cancellation
/// service should refund and release the hold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentRefundRequested {
    /// Reservation surrogate id.
    pub aggregate_id: i64,
    /// Public reservation code.
    pub reservation_code: String,
    /// Payment row id to refund.
    pub payment_id: i64,
    /// Amount to refund.
    pub amount: Money,
    /// ISO-4217 currency code.
    pub currency_code: String,
    /// Operator-readable reason.
    pub reason: String,
    /// When the event was recorded.
    pub occurred_at: DateTime<Utc>,
}

/// A payment charge attempt ended in a transport-level failure (timeout,
/// connection reset, undecodable response): the gateway's own ledger may or
/// may not show a captured charge. An offline job matches this reservation's
/// charge metadata against the gateway's ledger before deciding whether a
/// refund is owed; the charge is never silently treated as either succeeded
/// or failed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentReconciliationRequired {
    /// Reservation surrogate id.
    pub aggregate_id: i64,
    /// Public reservation code.
    pub reservation_code: String,
    /// Amount the charge attempt was for.
    pub amount: Money,
    /// ISO-4217 currency code.
    pub currency_code: String,
    /// Operator-readable reason, carrying the transport error detail.
    pub reason: String,
    /// When the event was recorded.
    pub occurred_at: DateTime<Utc>,
}

/// Any domain event an aggregate can raise.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum DomainEvent {
    /// See [`ReservationCreated`].
    ReservationCreated(ReservationCreated),
    /// See [`ReservationConfirmed`].
    ReservationConfirmed(ReservationConfirmed),
    /// See [`PaymentCompleted`].
    PaymentCompleted(PaymentCompleted),
    /// See [`PaymentRefundRequested`].
    PaymentRefundRequested(PaymentRefundRequested),
    /// See [`PaymentReconciliationRequired`].
    PaymentReconciliationRequired(PaymentReconciliationRequired),
}

impl DomainEvent {
    /// The outbox `event_type` string for this event.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ReservationCreated(_) => "ReservationCreated",
            Self::ReservationConfirmed(_) => "ReservationConfirmed",
            Self::PaymentCompleted(_) => "PaymentCompleted",
            Self::PaymentRefundRequested(_) => "PaymentRefundRequested",
            Self::PaymentReconciliationRequired(_) => "PaymentReconciliationRequired",
        }
    }

    /// The outbox `aggregate_type` string for this event. All variants
    /// today are raised by the reservation aggregate.
    #[must_use]
    pub fn aggregate_type(&self) -> &'static str {
        "reservation"
    }

    /// The id of the aggregate this event belongs to.
    #[must_use]
    pub fn aggregate_id(&self) -> i64 {
        match self {
            Self::ReservationCreated(e) => e.aggregate_id,
            Self::ReservationConfirmed(e) => e.aggregate_id,
            Self::PaymentCompleted(e) => e.aggregate_id,
            Self::PaymentRefundRequested(e) => e.aggregate_id,
            Self::PaymentReconciliationRequired(e) => e.aggregate_id,
        }
    }

    /// The event payload as a JSON value, ready for `outbox_events.payload`.
    ///
    /// Every field on every variant is itself JSON-representable (money,
    /// timestamps, strings), so encoding failure never happens in practice;
    /// callers still get `Value::Null` rather than a panic if it ever did.
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        let encoded = match self {
            Self::ReservationCreated(e) => serde_json::to_value(e),
            Self::ReservationConfirmed(e) => serde_json::to_value(e),
            Self::PaymentCompleted(e) => serde_json::to_value(e),
            Self::PaymentRefundRequested(e) => serde_json::to_value(e),
            Self::PaymentReconciliationRequired(e) => serde_json::to_value(e),
        };
        encoded.unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_and_aggregate_type_are_consistent() {
        let event = DomainEvent::ReservationCreated(ReservationCreated {
            aggregate_id: 1,
            reservation_code: "RES-20250108-A3K9M".to_string(),
            pickup_datetime: Utc::now(),
            total_amount: Money::from_cents(1000),
            currency_code: "USD".to_string(),
            occurred_at: Utc::now(),
        });
        assert_eq!(event.event_type(), "ReservationCreated");
        assert_eq!(event.aggregate_type(), "reservation");
        assert_eq!(event.aggregate_id(), 1);
        assert!(event.payload().is_object());
    }
}
