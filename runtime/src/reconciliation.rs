//! Reconciliation sweep for the PAID-but-not-CONFIRMED crash window (§4.9).
//!
//! A crash between T2 (payment captured) and T3 (reservation marked
//! `CONFIRMED`) leaves a reservation charged but still `PENDING`/
//! `ON_REQUEST`. This sweep finds such reservations once they've sat
//! untouched past a threshold and emits the same `PaymentRefundRequested`
//! event the coordinator emits for a known supplier failure after a
//! successful charge (§4.9's preferred resolution over a bare "await
//! external reconciliation"): the cancellation service refunds and
//! releases the hold. The sweep never replays the supplier call itself —
//! it has no way to tell a slow supplier from a permanently lost request.

use chrono::{DateTime, Duration, Utc};
use rental_core::environment::Clock;
use rental_core::domain::PaymentStatus;
use rental_core::events::{DomainEvent, PaymentRefundRequested};
use rental_core::ports::{UnitOfWorkError, UnitOfWorkFactory};
use std::sync::Arc;
use thiserror::Error;

/// Default age past which a PAID-but-unconfirmed reservation is considered
/// stuck rather than merely mid-flight.
pub const DEFAULT_STUCK_THRESHOLD: Duration = Duration::minutes(15);

/// Error surfaced by one reconciliation pass.
#[derive(Error, Debug)]
pub enum ReconciliationError {
    /// The backing unit of work failed.
    #[error("reconciliation sweep transaction error: {0}")]
    UnitOfWork(#[from] UnitOfWorkError),
}

/// Finds and flags PAID-but-not-CONFIRMED reservations.
pub struct ReconciliationSweep {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
    clock: Arc<dyn Clock>,
    stuck_threshold: Duration,
}

impl ReconciliationSweep {
    /// Construct a sweep over `uow_factory`, using `clock` for the age
    /// cutoff so tests can control it deterministically.
    #[must_use]
    pub fn new(uow_factory: Arc<dyn UnitOfWorkFactory>, clock: Arc<dyn Clock>) -> Self {
        Self { uow_factory, clock, stuck_threshold: DEFAULT_STUCK_THRESHOLD }
    }

    /// Override the default stuck-age threshold.
    #[must_use]
    pub const fn with_stuck_threshold(mut self, stuck_threshold: Duration) -> Self {
        self.stuck_threshold = stuck_threshold;
        self
    }

    /// Run one sweep: find every reservation stuck past the threshold and
    /// append one orphan event per row. Returns the number flagged.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing unit of work fails to open, query,
    /// or commit.
    pub async fn run_once(&self) -> Result<usize, ReconciliationError> {
        let cutoff = self.cutoff();
        let mut uow = self.uow_factory.begin().await?;
        let stuck = uow.reservations().list_paid_not_confirmed(cutoff).await?;

        let mut flagged = 0;
        for reservation in &stuck {
            let Some(reservation_id) = reservation.id else { continue };
            let payments = uow.payments().get_by_reservation_id(reservation_id).await?;
            let Some(payment) = payments.into_iter().find(|p| p.status == PaymentStatus::Paid) else {
                tracing::error!(
                    reservation.code = %reservation.reservation_code,
                    "reservation is PAID but has no captured payment row, cannot request a refund"
                );
                continue;
            };
            let Some(payment_id) = payment.id else { continue };

            let event = DomainEvent::PaymentRefundRequested(PaymentRefundRequested {
                aggregate_id: reservation_id,
                reservation_code: reservation.reservation_code.clone(),
                payment_id,
                amount: payment.amount,
                currency_code: payment.currency_code.clone(),
                reason: "payment captured but reservation never reached CONFIRMED before the crash-recovery threshold".to_string(),
                occurred_at: self.clock.now(),
            });
            uow.outbox()
                .append(event.event_type(), event.aggregate_type(), event.aggregate_id(), event.payload())
                .await
                .map_err(|err| UnitOfWorkError::Backend(err.to_string()))?;

            tracing::warn!(
                reservation.code = %reservation.reservation_code,
                reservation.supplier_id,
                "reservation paid but not confirmed past threshold, refund requested"
            );
            metrics::counter!("reconciliation.refund_requested").increment(1);
            flagged += 1;
        }

        uow.commit().await?;
        Ok(flagged)
    }

    /// Run the sweep on a fixed interval until `shutdown` is signaled.
    pub async fn run(&self, interval: std::time::Duration, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        tracing::info!(interval_secs = interval.as_secs(), "reconciliation sweep starting");
        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("reconciliation sweep shutting down");
                        return;
                    }
                }
                _ = tokio::time::sleep(interval) => {
                    match self.run_once().await {
                        Ok(flagged) if flagged > 0 => tracing::info!(flagged, "reconciliation sweep flagged stuck reservations"),
                        Ok(_) => {}
                        Err(err) => tracing::error!(error = %err, "reconciliation sweep failed"),
                    }
                }
            }
        }
    }

    fn cutoff(&self) -> DateTime<Utc> {
        self.clock.now() - self.stuck_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rental_core::domain::{PaymentStatus, Reservation};
    use rental_core::money::Money;
    use rental_core::state_machine::ReservationStatus;
    use rental_testing::in_memory::{InMemoryDb, InMemoryUnitOfWorkFactory};
    use rental_testing::mocks::FixedClock;

    fn paid_pending_reservation(updated_at: DateTime<Utc>) -> Reservation {
        let mut reservation = Reservation::create(
            "RES-20260101-00001".to_string(),
            1,
            1,
            1,
            1,
            None,
            updated_at,
            updated_at + Duration::days(2),
            2,
            "EUR".to_string(),
            rental_core::domain::Totals { public_price_total: Money::from_cents(10_000), ..Default::default() },
            1,
            updated_at,
        );
        reservation.status = ReservationStatus::Pending;
        reservation.payment_status = PaymentStatus::Paid;
        reservation.updated_at = updated_at;
        reservation
    }

    #[tokio::test]
    async fn flags_a_reservation_paid_past_the_threshold() {
        let now: DateTime<Utc> = "2026-01-01T12:00:00Z".parse().unwrap();
        let mut db = InMemoryDb::new();
        db.insert_reservation(paid_pending_reservation(now - Duration::hours(1)));
        let uow_factory = Arc::new(InMemoryUnitOfWorkFactory::with_db(db));
        let clock = Arc::new(FixedClock::new(now));

        let sweep = ReconciliationSweep::new(uow_factory, clock);
        let flagged = sweep.run_once().await.unwrap();
        assert_eq!(flagged, 1);
    }

    #[tokio::test]
    async fn does_not_flag_a_reservation_updated_recently() {
        let now: DateTime<Utc> = "2026-01-01T12:00:00Z".parse().unwrap();
        let mut db = InMemoryDb::new();
        db.insert_reservation(paid_pending_reservation(now - Duration::minutes(2)));
        let uow_factory = Arc::new(InMemoryUnitOfWorkFactory::with_db(db));
        let clock = Arc::new(FixedClock::new(now));

        let sweep = ReconciliationSweep::new(uow_factory, clock);
        let flagged = sweep.run_once().await.unwrap();
        assert_eq!(flagged, 0);
    }
}
