//! Payment entity (one-to-many from a reservation).

use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a payment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// No charge attempted yet.
    Unpaid,
    /// A charge is in flight.
    Pending,
    /// Charge succeeded and was captured.
    Paid,
    /// Charge failed.
    Failed,
    /// Fully refunded.
    Refunded,
    /// Partially refunded.
    PartiallyRefunded,
}

/// A payment attempt or capture against a reservation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Surrogate id, absent until persisted.
    pub id: Option<i64>,
    /// Owning reservation id.
    pub reservation_id: i64,
    /// Gateway provider name, e.g. `"STRIPE"`.
    pub provider: String,
    /// Provider-assigned transaction id.
    pub provider_transaction_id: Option<String>,
    /// Payment method label (e.g. `"card"`).
    pub method: Option<String>,
    /// Charged amount. Invariant: never negative.
    pub amount: Money,
    /// ISO-4217 currency code.
    pub currency_code: String,
    /// Current status.
    pub status: PaymentStatus,
    /// When the charge was captured, if it was.
    pub captured_at: Option<DateTime<Utc>>,
    /// When a refund was recorded, if any.
    pub refunded_at: Option<DateTime<Utc>>,
    /// Created timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-updated timestamp.
    pub updated_at: Option<DateTime<Utc>>,
    /// Stripe (or equivalent) PaymentIntent id.
    pub stripe_payment_intent_id: Option<String>,
    /// Stripe (or equivalent) charge id, set once captured.
    pub stripe_charge_id: Option<String>,
    /// Stripe (or equivalent) webhook event id that last touched this row.
    pub stripe_event_id: Option<String>,
    /// Amount refunded so far. Invariant: never exceeds `amount`.
    pub amount_refunded: Money,
    /// Gateway fee, once known.
    pub fee_amount: Option<Money>,
    /// Net amount after fees, once known.
    pub net_amount: Option<Money>,
}

/// Error returned by a [`Payment`] invariant violation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// `amount` was negative.
    #[error("payment amount cannot be negative")]
    NegativeAmount,
    /// `amount_refunded` exceeded `amount`.
    #[error("refunded amount cannot exceed the charged amount")]
    RefundExceedsAmount,
}

impl Payment {
    /// Construct a new, uncaptured payment row.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::NegativeAmount`] if `amount` is negative.
    pub fn new(
        reservation_id: i64,
        provider: impl Into<String>,
        provider_transaction_id: Option<String>,
        amount: Money,
        currency_code: impl Into<String>,
        status: PaymentStatus,
        created_at: DateTime<Utc>,
    ) -> Result<Self, PaymentError> {
        if amount.cents() < 0 {
            return Err(PaymentError::NegativeAmount);
        }
        Ok(Self {
            id: None,
            reservation_id,
            provider: provider.into(),
            provider_transaction_id,
            method: None,
            amount,
            currency_code: currency_code.into(),
            status,
            captured_at: None,
            refunded_at: None,
            created_at,
            updated_at: None,
            stripe_payment_intent_id: None,
            stripe_charge_id: None,
            stripe_event_id: None,
            amount_refunded: Money::ZERO,
            fee_amount: None,
            net_amount: None,
        })
    }

    /// Mark the payment captured: status becomes `PAID`, `captured_at` and
    /// `stripe_charge_id` are set.
    pub fn mark_as_captured(&mut self, charge_id: impl Into<String>, now: DateTime<Utc>) {
        self.status = PaymentStatus::Paid;
        self.captured_at = Some(now);
        self.stripe_charge_id = Some(charge_id.into());
        self.updated_at = Some(now);
    }

    /// Whether the payment succeeded.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.status == PaymentStatus::Paid
    }

    /// Record a refund, checking the `amount_refunded ≤ amount` invariant.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::RefundExceedsAmount`] if the cumulative
    /// refunded amount would exceed the charged amount.
    pub fn record_refund(&mut self, refunded: Money, now: DateTime<Utc>) -> Result<(), PaymentError> {
        let total = self.amount_refunded.saturating_add(refunded);
        if total > self.amount {
            return Err(PaymentError::RefundExceedsAmount);
        }
        self.amount_refunded = total;
        self.refunded_at = Some(now);
        self.status = if total == self.amount {
            PaymentStatus::Refunded
        } else {
            PaymentStatus::PartiallyRefunded
        };
        self.updated_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-08T10:00:00Z").unwrap().into()
    }

    #[test]
    fn rejects_negative_amount() {
        let result = Payment::new(1, "STRIPE", None, Money::from_cents(-1), "USD", PaymentStatus::Unpaid, now());
        assert_eq!(result.unwrap_err(), PaymentError::NegativeAmount);
    }

    #[test]
    fn mark_as_captured_sets_paid_and_charge_id() {
        let mut p = Payment::new(1, "STRIPE", None, Money::from_cents(1000), "USD", PaymentStatus::Pending, now()).unwrap();
        p.mark_as_captured("ch_123", now());
        assert!(p.is_successful());
        assert_eq!(p.captured_at, Some(now()));
        assert_eq!(p.stripe_charge_id, Some("ch_123".to_string()));
    }

    #[test]
    fn refund_cannot_exceed_amount() {
        let mut p = Payment::new(1, "STRIPE", None, Money::from_cents(1000), "USD", PaymentStatus::Paid, now()).unwrap();
        assert!(p.record_refund(Money::from_cents(1001), now()).is_err());
    }

    #[test]
    fn partial_refund_sets_partially_refunded() {
        let mut p = Payment::new(1, "STRIPE", None, Money::from_cents(1000), "USD", PaymentStatus::Paid, now()).unwrap();
        p.record_refund(Money::from_cents(400), now()).unwrap();
        assert_eq!(p.status, PaymentStatus::PartiallyRefunded);
        p.record_refund(Money::from_cents(600), now()).unwrap();
        assert_eq!(p.status, PaymentStatus::Refunded);
    }
}
