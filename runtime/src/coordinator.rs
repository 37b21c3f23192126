//! The Reservation Commit Coordinator: orchestrates the state machine, code
//! generator, unit of work, payment gateway and supplier gateway ports
//! through the booking protocol.
//!
//! The protocol is three independently-committed local transactions (T1,
//! T2, T3) interleaved with two external calls (E1 payment, E2 supplier).
//! Each `UnitOfWork` is consumed by its own `commit`/`rollback`, so every
//! step that needs one opens a fresh transaction rather than holding one
//! across an external call — an external call never happens while a
//! database transaction is open.

use chrono::{DateTime, NaiveDate, Utc};
use rental_core::code_generator;
use rental_core::domain::{
    Contact, ContactType, Driver, Payment, PaymentStatus, Reservation, Snapshots, SupplierRequestAudit,
    SupplierRequestOutcome, Totals,
};
use rental_core::environment::Clock;
use rental_core::error::{CoordinatorError, PaymentFailureReason};
use rental_core::events::DomainEvent;
use rental_core::money::Money;
use rental_core::ports::{
    PaymentErrorSource, PaymentGateway, PaymentGatewayError, SupplierGatewayError, UnitOfWork, UnitOfWorkError,
    UnitOfWorkFactory,
};
use rental_gateways::SupplierGatewayFactory;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// A driver to attach to the reservation as its primary driver.
#[derive(Clone, Debug)]
pub struct DriverInput {
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Contact email; also used as the BOOKER contact's email.
    pub email: String,
    /// Contact phone.
    pub phone: Option<String>,
    /// Date of birth, for the minimum-age check.
    pub date_of_birth: Option<NaiveDate>,
    /// Driver's license number.
    pub driver_license_number: Option<String>,
    /// Country that issued the license.
    pub driver_license_country: Option<String>,
}

/// Input to [`ReservationCommitCoordinator::create_reservation`].
#[derive(Clone, Debug)]
pub struct BookingRequest {
    /// Supplier fulfilling the booking.
    pub supplier_id: i64,
    /// Pickup office.
    pub pickup_office_id: i64,
    /// Dropoff office.
    pub dropoff_office_id: i64,
    /// Car category booked.
    pub car_category_id: i64,
    /// Supplier-specific car product id, if selected.
    pub supplier_car_product_id: Option<i64>,
    /// ACRISS code of the booked category, for the snapshot and the
    /// supplier payload.
    pub car_acriss_code: Option<String>,
    /// Scheduled pickup time.
    pub pickup_datetime: DateTime<Utc>,
    /// Scheduled dropoff time.
    pub dropoff_datetime: DateTime<Utc>,
    /// Rental length in whole days.
    pub rental_days: i64,
    /// ISO-4217 currency code.
    pub currency_code: String,
    /// Fixed-point totals.
    pub totals: Totals,
    /// Marketing channel id.
    pub sales_channel_id: i64,
    /// Registered customer id, if the booker is a known customer.
    pub app_customer_id: Option<i64>,
    /// The primary driver, who also becomes the BOOKER contact.
    pub primary_driver: DriverInput,
    /// Tokenized payment method, already collected by the client.
    pub payment_method_id: String,
}

/// Successful outcome of [`ReservationCommitCoordinator::create_reservation`].
#[derive(Clone, Debug, PartialEq)]
pub struct BookingResult {
    /// The new reservation's public code.
    pub reservation_code: String,
    /// Supplier-assigned confirmation number.
    pub supplier_confirmation_number: String,
    /// Receipt URL, if a receipt generator is wired up. Always `None`
    /// today; no such port exists in this crate.
    pub receipt_url: Option<String>,
}

/// Static configuration the coordinator needs beyond its collaborating
/// ports.
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    /// Payment provider name recorded on [`Payment::provider`], e.g. `"STRIPE"`.
    pub payment_provider_name: String,
}

/// Orchestrates the booking protocol described in the module docs.
pub struct ReservationCommitCoordinator {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
    payment_gateway: Arc<dyn PaymentGateway>,
    supplier_gateways: Arc<SupplierGatewayFactory>,
    clock: Arc<dyn Clock>,
    config: CoordinatorConfig,
}

impl ReservationCommitCoordinator {
    /// Construct a coordinator over its collaborating ports.
    #[must_use]
    pub fn new(
        uow_factory: Arc<dyn UnitOfWorkFactory>,
        payment_gateway: Arc<dyn PaymentGateway>,
        supplier_gateways: Arc<SupplierGatewayFactory>,
        clock: Arc<dyn Clock>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            uow_factory,
            payment_gateway,
            supplier_gateways,
            clock,
            config,
        }
    }

    /// Run the full booking protocol: T1, E1, T2, E2, T3.
    ///
    /// # Errors
    ///
    /// Returns a [`CoordinatorError`] at whichever step first fails; see
    /// the module docs for the outcome each step produces.
    pub async fn create_reservation(&self, request: BookingRequest) -> Result<BookingResult, CoordinatorError> {
        let now = self.clock.now();

        let supplier_gateway = self
            .supplier_gateways
            .get(request.supplier_id)
            .await
            .ok_or_else(|| CoordinatorError::Validation(format!("no adapter configured for supplier {}", request.supplier_id)))?;

        let (mut reservation, pickup_office_code, dropoff_office_code) = self.run_t1(&request, now).await?;
        let reservation_id = reservation
            .id
            .ok_or_else(|| CoordinatorError::Internal("T1 committed without assigning a surrogate id".to_string()))?;

        tracing::info!(reservation_code = %reservation.reservation_code, reservation_id, "reservation created, awaiting payment");
        metrics::counter!("reservations.created").increment(1);

        let charge_outcome = self
            .payment_gateway
            .charge(
                request.totals.public_price_total,
                &request.currency_code,
                &request.payment_method_id,
                &format!("Reservation {}", reservation.reservation_code),
                &HashMap::from([
                    ("reservation_id".to_string(), reservation_id.to_string()),
                    ("reservation_code".to_string(), reservation.reservation_code.clone()),
                ]),
            )
            .await;

        let payment_result = match charge_outcome {
            Ok(result) => result,
            Err(PaymentGatewayError::Transport { source, detail }) => {
                tracing::error!(reservation_id, source = ?source, detail, "payment gateway transport error");
                let reason = match source {
                    PaymentErrorSource::Connection => PaymentFailureReason::Timeout,
                    _ => PaymentFailureReason::Gateway,
                };

                if let Err(append_err) = self
                    .request_payment_reconciliation(
                        reservation_id,
                        &reservation.reservation_code,
                        request.totals.public_price_total,
                        &request.currency_code,
                        &detail,
                        now,
                    )
                    .await
                {
                    tracing::error!(reservation_id, error = %append_err, "failed to record payment reconciliation event after transport error");
                }

                return Err(CoordinatorError::PaymentFailed {
                    reason,
                    detail: Some(detail),
                });
            }
            Err(PaymentGatewayError::InvalidSignature) => {
                return Err(CoordinatorError::Internal("payment gateway returned an unexpected signature error".to_string()));
            }
        };

        if !payment_result.success {
            tracing::warn!(reservation_id, reason = ?payment_result.error_message, "payment declined");
            metrics::counter!("reservations.payment_failed").increment(1);
            return Err(CoordinatorError::PaymentFailed {
                reason: PaymentFailureReason::Card,
                detail: payment_result.error_message,
            });
        }

        let payment = self.run_t2(&mut reservation, &payment_result, &request, now).await?;

        tracing::info!(reservation_id, payment_intent_id = %payment_result.payment_intent_id, "payment captured, calling supplier");

        let supplier_payload = supplier_request_payload(&reservation, &request, &pickup_office_code, &dropoff_office_code);
        let supplier_outcome = supplier_gateway.create_reservation(&supplier_payload).await;

        self.run_t3(&mut reservation, &payment, &supplier_payload, supplier_outcome, now).await
    }

    /// Record that a payment charge attempt ended with an unknown outcome,
    /// in its own fresh transaction, so an offline job can match this
    /// reservation's charge metadata against the gateway's ledger. Never
    /// treats a transport error as charge-then-ignore.
    async fn request_payment_reconciliation(
        &self,
        reservation_id: i64,
        reservation_code: &str,
        amount: Money,
        currency_code: &str,
        detail: &str,
        now: DateTime<Utc>,
    ) -> Result<(), CoordinatorError> {
        let mut uow = self.uow_factory.begin().await.map_err(map_uow_error)?;
        append_event(
            uow.as_mut(),
            &DomainEvent::PaymentReconciliationRequired(rental_core::events::PaymentReconciliationRequired {
                aggregate_id: reservation_id,
                reservation_code: reservation_code.to_string(),
                amount,
                currency_code: currency_code.to_string(),
                reason: format!("payment gateway transport error: {detail}"),
                occurred_at: now,
            }),
        )
        .await?;
        uow.commit().await.map_err(map_uow_error)?;
        metrics::counter!("reservations.payment_reconciliation_requested").increment(1);
        Ok(())
    }

    /// T1: open a UoW, fetch supplier and offices, check availability,
    /// generate a unique code, construct the reservation in
    /// `PENDING`/`UNPAID`, save, and commit.
    async fn run_t1(
        &self,
        request: &BookingRequest,
        now: DateTime<Utc>,
    ) -> Result<(Reservation, String, String), CoordinatorError> {
        let mut uow = self.uow_factory.begin().await.map_err(map_uow_error)?;

        let supplier = uow
            .suppliers()
            .get_by_id(request.supplier_id)
            .await
            .map_err(map_uow_error)?
            .ok_or_else(|| CoordinatorError::Validation(format!("unknown supplier {}", request.supplier_id)))?;
        let pickup_office = uow
            .offices()
            .get_by_id(request.pickup_office_id)
            .await
            .map_err(map_uow_error)?
            .ok_or_else(|| CoordinatorError::Validation(format!("unknown pickup office {}", request.pickup_office_id)))?;
        let dropoff_office = uow
            .offices()
            .get_by_id(request.dropoff_office_id)
            .await
            .map_err(map_uow_error)?
            .ok_or_else(|| CoordinatorError::Validation(format!("unknown dropoff office {}", request.dropoff_office_id)))?;

        let available = uow
            .reservations()
            .check_availability(request.car_category_id, request.supplier_id, request.pickup_datetime, request.dropoff_datetime)
            .await
            .map_err(map_uow_error)?;
        if !available {
            return Err(CoordinatorError::Validation(format!(
                "car category {} is not available from supplier {} for the requested window",
                request.car_category_id, request.supplier_id
            )));
        }

        let code = generate_unique_code(uow.reservations(), self.clock.as_ref()).await?;

        let mut reservation = Reservation::create(
            code,
            request.supplier_id,
            request.pickup_office_id,
            request.dropoff_office_id,
            request.car_category_id,
            request.supplier_car_product_id,
            request.pickup_datetime,
            request.dropoff_datetime,
            request.rental_days,
            request.currency_code.clone(),
            request.totals,
            request.sales_channel_id,
            now,
        );
        reservation.app_customer_id = request.app_customer_id;
        reservation.snapshots = Snapshots {
            supplier_name: Some(supplier.name.clone()),
            pickup_office_code: Some(pickup_office.code.clone()),
            pickup_office_name: Some(pickup_office.name.clone()),
            dropoff_office_code: Some(dropoff_office.code.clone()),
            dropoff_office_name: Some(dropoff_office.name.clone()),
            pickup_city_name: Some(pickup_office.city_name.clone()),
            pickup_country_name: Some(pickup_office.country_name.clone()),
            car_acriss_code: request.car_acriss_code.clone(),
            car_category_name: None,
        };

        let mut driver = Driver::new(request.primary_driver.first_name.clone(), request.primary_driver.last_name.clone(), true)
            .map_err(CoordinatorError::Validation)?;
        driver.email = Some(request.primary_driver.email.clone());
        driver.phone = request.primary_driver.phone.clone();
        driver.date_of_birth = request.primary_driver.date_of_birth;
        driver.driver_license_number = request.primary_driver.driver_license_number.clone();
        driver.driver_license_country = request.primary_driver.driver_license_country.clone();
        reservation.add_driver(driver);

        let contact = Contact::new(
            ContactType::Booker,
            format!("{} {}", request.primary_driver.first_name, request.primary_driver.last_name),
            request.primary_driver.email.clone(),
            request.primary_driver.phone.clone(),
        )
        .map_err(CoordinatorError::Validation)?;
        reservation.add_contact(contact);

        if !reservation.is_bookable() {
            return Err(CoordinatorError::Validation(
                "reservation requires a primary driver and a booker contact".to_string(),
            ));
        }

        let id = uow.reservations().save(&reservation).await.map_err(map_uow_error)?;
        reservation.id = Some(id);

        uow.commit().await.map_err(map_uow_error)?;

        Ok((reservation, pickup_office.code, dropoff_office.code))
    }

    /// T2: on a successful charge, persist the payment and mark the
    /// reservation paid in a fresh transaction.
    async fn run_t2(
        &self,
        reservation: &mut Reservation,
        payment_result: &rental_core::ports::PaymentResult,
        request: &BookingRequest,
        now: DateTime<Utc>,
    ) -> Result<Payment, CoordinatorError> {
        let mut uow = self.uow_factory.begin().await.map_err(map_uow_error)?;

        let reservation_id = reservation
            .id
            .ok_or_else(|| CoordinatorError::Internal("T2 called before the reservation was persisted".to_string()))?;
        let mut payment = Payment::new(
            reservation_id,
            self.config.payment_provider_name.clone(),
            payment_result.charge_id.clone().or_else(|| Some(payment_result.payment_intent_id.clone())),
            request.totals.public_price_total,
            request.currency_code.clone(),
            PaymentStatus::Pending,
            now,
        )
        .map_err(|err| CoordinatorError::Internal(err.to_string()))?;
        payment.stripe_payment_intent_id = Some(payment_result.payment_intent_id.clone());
        payment.method = payment_result.method.clone();
        payment.mark_as_captured(
            payment_result.charge_id.clone().unwrap_or_else(|| payment_result.payment_intent_id.clone()),
            now,
        );

        let payment_id = uow.payments().save(&payment).await.map_err(map_uow_error)?;
        payment.id = Some(payment_id);

        reservation.mark_as_paid(now);
        uow.reservations().update(reservation).await.map_err(map_uow_error)?;

        uow.commit().await.map_err(map_uow_error)?;

        Ok(payment)
    }

    /// T3: unconditionally log the supplier call's outcome, then either
    /// confirm the reservation and drain its events, or leave it
    /// unconfirmed and request a refund.
    async fn run_t3(
        &self,
        reservation: &mut Reservation,
        payment: &Payment,
        supplier_payload: &Value,
        supplier_outcome: Result<rental_core::ports::CreateReservationResult, SupplierGatewayError>,
        now: DateTime<Utc>,
    ) -> Result<BookingResult, CoordinatorError> {
        let reservation_id = reservation
            .id
            .ok_or_else(|| CoordinatorError::Internal("T3 called before the reservation was persisted".to_string()))?;
        let mut uow = self.uow_factory.begin().await.map_err(map_uow_error)?;

        let audit = build_audit_row(reservation_id, reservation.supplier_id, supplier_payload, &supplier_outcome, now);
        uow.supplier_requests().append(&audit).await.map_err(map_uow_error)?;

        match supplier_outcome {
            Ok(result) => {
                reservation.confirm_with_supplier(result.confirmation_number.clone(), now)?;
                uow.reservations().update(reservation).await.map_err(map_uow_error)?;

                for event in reservation.clear_events() {
                    append_event(uow.as_mut(), &event).await?;
                }
                append_event(
                    uow.as_mut(),
                    &DomainEvent::PaymentCompleted(rental_core::events::PaymentCompleted {
                        aggregate_id: reservation_id,
                        reservation_code: reservation.reservation_code.clone(),
                        payment_id: payment.id.unwrap_or_default(),
                        amount: payment.amount,
                        currency_code: payment.currency_code.clone(),
                        occurred_at: now,
                    }),
                )
                .await?;

                uow.commit().await.map_err(map_uow_error)?;

                tracing::info!(reservation_id, supplier_code = %result.confirmation_number, "reservation confirmed with supplier");
                metrics::counter!("reservations.confirmed").increment(1);

                Ok(BookingResult {
                    reservation_code: reservation.reservation_code.clone(),
                    supplier_confirmation_number: result.confirmation_number,
                    receipt_url: None,
                })
            }
            Err(err) => {
                let (retryable, detail) = match &err {
                    SupplierGatewayError::Rejected { detail } => (false, detail.clone()),
                    SupplierGatewayError::ExhaustedRetries { detail } => (true, detail.clone()),
                    SupplierGatewayError::Timeout => (true, "supplier call timed out".to_string()),
                };

                append_event(
                    uow.as_mut(),
                    &DomainEvent::PaymentRefundRequested(rental_core::events::PaymentRefundRequested {
                        aggregate_id: reservation_id,
                        reservation_code: reservation.reservation_code.clone(),
                        payment_id: payment.id.unwrap_or_default(),
                        amount: payment.amount,
                        currency_code: payment.currency_code.clone(),
                        reason: format!("supplier confirmation failed: {detail}"),
                        occurred_at: now,
                    }),
                )
                .await?;

                uow.commit().await.map_err(map_uow_error)?;

                tracing::error!(reservation_id, detail, "supplier confirmation failed, refund requested");
                metrics::counter!("reservations.supplier_confirmation_failed").increment(1);

                Err(CoordinatorError::SupplierConfirmationFailed {
                    retryable,
                    detail: Some(detail),
                })
            }
        }
    }
}

async fn generate_unique_code(
    reservations: &mut dyn rental_core::ports::ReservationRepo,
    clock: &dyn Clock,
) -> Result<String, CoordinatorError> {
    const MAX_ATTEMPTS: u32 = 10;
    for _ in 0..MAX_ATTEMPTS {
        let candidate = code_generator::generate(clock);
        if !reservations.exists_by_code(&candidate).await.map_err(map_uow_error)? {
            return Ok(candidate);
        }
    }
    Err(CoordinatorError::Internal(format!(
        "failed to generate a unique reservation code after {MAX_ATTEMPTS} attempts"
    )))
}

fn supplier_request_payload(reservation: &Reservation, request: &BookingRequest, pickup_office_code: &str, dropoff_office_code: &str) -> Value {
    json!({
        "internal_code": reservation.reservation_code,
        "pickup_office_code": pickup_office_code,
        "dropoff_office_code": dropoff_office_code,
        "pickup_datetime": request.pickup_datetime.to_rfc3339(),
        "dropoff_datetime": request.dropoff_datetime.to_rfc3339(),
        "vehicle_code": request.car_acriss_code,
        "driver": {
            "first_name": request.primary_driver.first_name,
            "last_name": request.primary_driver.last_name,
            "email": request.primary_driver.email,
            "phone": request.primary_driver.phone,
        },
    })
}

fn build_audit_row(
    reservation_id: i64,
    supplier_id: i64,
    request_payload: &Value,
    outcome: &Result<rental_core::ports::CreateReservationResult, SupplierGatewayError>,
    now: DateTime<Utc>,
) -> SupplierRequestAudit {
    let (audit_outcome, error_code, error_message, response_payload) = match outcome {
        Ok(result) => (
            SupplierRequestOutcome::Success,
            None,
            None,
            Some(json!({
                "confirmation_number": result.confirmation_number,
                "status": result.status,
            })),
        ),
        Err(SupplierGatewayError::Rejected { detail }) => (SupplierRequestOutcome::Failed, Some("REJECTED".to_string()), Some(detail.clone()), None),
        Err(SupplierGatewayError::ExhaustedRetries { detail }) => {
            (SupplierRequestOutcome::Failed, Some("EXHAUSTED_RETRIES".to_string()), Some(detail.clone()), None)
        }
        Err(SupplierGatewayError::Timeout) => (SupplierRequestOutcome::Timeout, Some("TIMEOUT".to_string()), Some("supplier call timed out".to_string()), None),
    };

    let mut audit = SupplierRequestAudit::new(reservation_id, supplier_id, "create_reservation", 1, audit_outcome, request_payload.clone(), now);
    audit.error_code = error_code;
    audit.error_message = error_message;
    audit.response_payload = response_payload;
    audit
}

async fn append_event(uow: &mut dyn UnitOfWork, event: &DomainEvent) -> Result<(), CoordinatorError> {
    uow.outbox()
        .append(event.event_type(), event.aggregate_type(), event.aggregate_id(), event.payload())
        .await
        .map_err(|err| CoordinatorError::Internal(err.to_string()))
}

fn map_uow_error(err: UnitOfWorkError) -> CoordinatorError {
    match err {
        UnitOfWorkError::NotFound { entity, id } => CoordinatorError::ReservationNotFound(format!("{entity} {id}")),
        UnitOfWorkError::OptimisticConcurrency { entity, id } => CoordinatorError::OptimisticConcurrency { entity, id },
        UnitOfWorkError::Conflict(detail) => CoordinatorError::Validation(detail),
        UnitOfWorkError::Backend(detail) => CoordinatorError::Internal(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rental_core::money::Money;
    use rental_core::ports::{CreateReservationResult, CustomerRow, OfficeRow, Offer, PaymentResult, SupplierRow};
    use rental_testing::{FixedClock, InMemoryDb, InMemoryUnitOfWorkFactory, StubPaymentGateway, StubSupplierGateway};
    use std::collections::HashMap;

    #[test]
    fn payment_refund_event_reason_includes_detail() {
        let event = DomainEvent::PaymentRefundRequested(rental_core::events::PaymentRefundRequested {
            aggregate_id: 1,
            reservation_code: "RES-20250108-A3K9M".to_string(),
            payment_id: 2,
            amount: Money::from_cents(1000),
            currency_code: "USD".to_string(),
            reason: "supplier confirmation failed: supplier rejected the request: bad vehicle code".to_string(),
            occurred_at: Utc::now(),
        });
        assert_eq!(event.event_type(), "PaymentRefundRequested");
    }

    fn seeded_db() -> InMemoryDb {
        let mut db = InMemoryDb::new();
        db.insert_supplier(SupplierRow { id: 5, name: "Acme Rentals".to_string() });
        db.insert_office(OfficeRow {
            id: 10,
            code: "LIS1".to_string(),
            name: "Lisbon Airport".to_string(),
            city_name: "Lisbon".to_string(),
            country_name: "Portugal".to_string(),
        });
        db.insert_office(OfficeRow {
            id: 11,
            code: "LIS2".to_string(),
            name: "Lisbon Downtown".to_string(),
            city_name: "Lisbon".to_string(),
            country_name: "Portugal".to_string(),
        });
        db.insert_customer(CustomerRow { id: 7, full_name: "Jane Doe".to_string(), email: "jane@example.com".to_string() });
        db
    }

    fn booking_request() -> BookingRequest {
        BookingRequest {
            supplier_id: 5,
            pickup_office_id: 10,
            dropoff_office_id: 11,
            car_category_id: 1,
            supplier_car_product_id: None,
            car_acriss_code: Some("ECMR".to_string()),
            pickup_datetime: "2026-08-10T10:00:00Z".parse().unwrap(),
            dropoff_datetime: "2026-08-13T10:00:00Z".parse().unwrap(),
            rental_days: 3,
            currency_code: "EUR".to_string(),
            totals: Totals { public_price_total: Money::from_cents(30_000), ..Default::default() },
            sales_channel_id: 1,
            app_customer_id: Some(7),
            primary_driver: DriverInput {
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
                email: "jane@example.com".to_string(),
                phone: None,
                date_of_birth: None,
                driver_license_number: None,
                driver_license_country: None,
            },
            payment_method_id: "pm_test".to_string(),
        }
    }

    fn successful_payment_result() -> PaymentResult {
        PaymentResult {
            success: true,
            payment_intent_id: "pi_test".to_string(),
            charge_id: Some("ch_test".to_string()),
            amount: Money::from_cents(30_000),
            currency_code: "EUR".to_string(),
            status: "succeeded".to_string(),
            method: Some("card".to_string()),
            error_message: None,
        }
    }

    #[tokio::test]
    async fn happy_path_confirms_reservation_and_drains_events() {
        let uow_factory = Arc::new(InMemoryUnitOfWorkFactory::with_db(seeded_db()));
        let payment_gateway = Arc::new(StubPaymentGateway::succeeding(successful_payment_result()));
        let supplier_gateway = Arc::new(StubSupplierGateway::succeeding(
            Vec::<Offer>::new(),
            CreateReservationResult {
                confirmation_number: "SUP-123".to_string(),
                status: "CONFIRMED".to_string(),
                total_price: Money::from_cents(28_000),
                currency_code: "EUR".to_string(),
            },
        ));
        let supplier_gateways =
            Arc::new(SupplierGatewayFactory::from_adapters(HashMap::from([(5, supplier_gateway as Arc<dyn rental_core::ports::SupplierGateway>)])));
        let clock = Arc::new(FixedClock::new(Utc::now()));

        let coordinator = ReservationCommitCoordinator::new(
            uow_factory.clone(),
            payment_gateway,
            supplier_gateways,
            clock,
            CoordinatorConfig { payment_provider_name: "STRIPE".to_string() },
        );

        let result = coordinator.create_reservation(booking_request()).await.expect("booking should succeed");
        assert_eq!(result.supplier_confirmation_number, "SUP-123");
        assert!(result.reservation_code.starts_with("RES-"));

        let db = uow_factory.db();
        let events = db.lock().unwrap().outbox_events();
        let event_types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert!(event_types.contains(&"ReservationCreated"));
        assert!(event_types.contains(&"ReservationConfirmed"));
        assert!(event_types.contains(&"PaymentCompleted"));
    }

    #[tokio::test]
    async fn overlapping_reservation_fails_fast_before_any_write() {
        let mut db = seeded_db();
        let now = Utc::now();
        let conflicting = Reservation::create(
            "RES-20260101-EXIST".to_string(),
            5,
            10,
            11,
            1,
            None,
            "2026-08-11T10:00:00Z".parse().unwrap(),
            "2026-08-12T10:00:00Z".parse().unwrap(),
            1,
            "EUR".to_string(),
            Totals::default(),
            1,
            now,
        );
        db.insert_reservation(conflicting);

        let uow_factory = Arc::new(InMemoryUnitOfWorkFactory::with_db(db));
        let payment_gateway = Arc::new(StubPaymentGateway::succeeding(successful_payment_result()));
        let supplier_gateway = Arc::new(StubSupplierGateway::failing_create(SupplierGatewayError::Rejected {
            detail: "should never be called".to_string(),
        }));
        let supplier_gateways =
            Arc::new(SupplierGatewayFactory::from_adapters(HashMap::from([(5, supplier_gateway as Arc<dyn rental_core::ports::SupplierGateway>)])));
        let clock = Arc::new(FixedClock::new(now));

        let coordinator = ReservationCommitCoordinator::new(
            uow_factory.clone(),
            payment_gateway.clone(),
            supplier_gateways,
            clock,
            CoordinatorConfig { payment_provider_name: "STRIPE".to_string() },
        );

        let err = coordinator.create_reservation(booking_request()).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::Validation(_)));
        assert_eq!(payment_gateway.call_count(), 0, "payment must never be attempted once availability fails");
    }

    #[tokio::test]
    async fn declined_payment_never_opens_t2_or_drains_the_created_event() {
        let uow_factory = Arc::new(InMemoryUnitOfWorkFactory::with_db(seeded_db()));
        let payment_gateway = Arc::new(StubPaymentGateway::succeeding(PaymentResult {
            success: false,
            error_message: Some("card declined".to_string()),
            ..successful_payment_result()
        }));
        let supplier_gateway = Arc::new(StubSupplierGateway::failing_create(SupplierGatewayError::Rejected {
            detail: "should never be called".to_string(),
        }));
        let supplier_gateways =
            Arc::new(SupplierGatewayFactory::from_adapters(HashMap::from([(5, supplier_gateway as Arc<dyn rental_core::ports::SupplierGateway>)])));
        let clock = Arc::new(FixedClock::new(Utc::now()));

        let coordinator = ReservationCommitCoordinator::new(
            uow_factory.clone(),
            payment_gateway,
            supplier_gateways,
            clock,
            CoordinatorConfig { payment_provider_name: "STRIPE".to_string() },
        );

        let err = coordinator.create_reservation(booking_request()).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::PaymentFailed { reason: PaymentFailureReason::Card, .. }));

        let db = uow_factory.db();
        let db = db.lock().unwrap();
        assert!(db.outbox_events().is_empty(), "ReservationCreated must stay undrained when payment fails");
    }
}
