//! `POST /reservations`, `GET /reservations/{code}`, `GET /reservations` (§6).

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rental_core::domain::Reservation;
use rental_core::error::CoordinatorError;
use rental_core::idempotency::{canonicalize, compute_request_hash, IdempotencyStoreError, CLAIMED_HTTP_STATUS};
use rental_core::money::Money;
use rental_core::pricing;
use rental_runtime::{BookingRequest, DriverInput};
use serde::{Deserialize, Serialize};

/// Header carrying the client-supplied idempotency key (§4.4, §6).
pub const IDEMPOTENCY_KEY_HEADER: &str = "X-Idempotency-Key";

/// Idempotency scope for `POST /reservations`.
const CREATE_RESERVATION_SCOPE: &str = "create_reservation";

#[derive(Debug, Deserialize)]
struct DriverRequest {
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    date_of_birth: Option<NaiveDate>,
    driver_license_number: Option<String>,
    driver_license_country: Option<String>,
}

/// `POST /reservations` request body.
#[derive(Debug, Deserialize)]
struct CreateReservationRequest {
    supplier_id: i64,
    pickup_office_id: i64,
    dropoff_office_id: i64,
    car_category_id: i64,
    vehicle_id: Option<i64>,
    acriss_code: Option<String>,
    pickup_datetime: DateTime<Utc>,
    dropoff_datetime: DateTime<Utc>,
    price: String,
    currency_code: String,
    payment_method_id: String,
    sales_channel_id: Option<i64>,
    app_customer_id: Option<i64>,
    driver: DriverRequest,
}

impl CreateReservationRequest {
    fn into_booking_request(self) -> Result<BookingRequest, AppError> {
        if self.car_category_id == 0 {
            return Err(AppError::bad_request("car_category_id is a pending-lookup placeholder and cannot be booked directly"));
        }
        if self.dropoff_datetime <= self.pickup_datetime {
            return Err(AppError::bad_request("dropoff_datetime must be after pickup_datetime"));
        }
        let price: Money = self
            .price
            .parse()
            .map_err(|_| AppError::bad_request(format!("invalid price literal: {}", self.price)))?;
        let rental_days = pricing::rental_days(self.pickup_datetime, self.dropoff_datetime);

        Ok(BookingRequest {
            supplier_id: self.supplier_id,
            pickup_office_id: self.pickup_office_id,
            dropoff_office_id: self.dropoff_office_id,
            car_category_id: self.car_category_id,
            supplier_car_product_id: self.vehicle_id,
            car_acriss_code: self.acriss_code,
            pickup_datetime: self.pickup_datetime,
            dropoff_datetime: self.dropoff_datetime,
            rental_days,
            currency_code: self.currency_code,
            totals: rental_core::domain::Totals { public_price_total: price, ..Default::default() },
            sales_channel_id: self.sales_channel_id.unwrap_or(0),
            app_customer_id: self.app_customer_id,
            primary_driver: DriverInput {
                first_name: self.driver.first_name,
                last_name: self.driver.last_name,
                email: self.driver.email,
                phone: self.driver.phone,
                date_of_birth: self.driver.date_of_birth,
                driver_license_number: self.driver.driver_license_number,
                driver_license_country: self.driver.driver_license_country,
            },
            payment_method_id: self.payment_method_id,
        })
    }
}

/// `POST /reservations` success response body.
#[derive(Debug, Serialize)]
struct CreateReservationResponse {
    reservation_code: String,
    supplier_reservation_code: String,
    status: &'static str,
    payment_status: &'static str,
    receipt_url: Option<String>,
}

/// Create a reservation, honoring `X-Idempotency-Key` if present (§4.4).
///
/// A present key is first inserted as a claim row (sentinel
/// [`CLAIMED_HTTP_STATUS`], `Null` body): the claim's own uniqueness
/// constraint is what makes two concurrent identical requests race safely,
/// rather than both independently reaching the coordinator. The loser of
/// the race never calls the coordinator; it either replays the winner's
/// completed response or reports the request as still in flight. If the
/// coordinator call fails after a successful claim, the claim is released
/// so a legitimate retry can proceed.
///
/// # Errors
///
/// Returns 422 on validation failure, 402 on a declined/invalid charge,
/// 503 on a supplier failure, 409 on a conflicting idempotency key, and 409
/// if the same key is currently claimed by another in-flight request.
pub async fn create_reservation(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<Response, AppError> {
    let raw: serde_json::Value = serde_json::from_slice(&body).map_err(|err| AppError::bad_request(format!("invalid JSON body: {err}")))?;
    let request_hash = compute_request_hash(&raw);

    let idem_key = headers.get(IDEMPOTENCY_KEY_HEADER).and_then(|v| v.to_str().ok()).map(str::to_string);

    if let Some(key) = &idem_key {
        match state
            .idempotency
            .put(CREATE_RESERVATION_SCOPE, key, &request_hash, serde_json::Value::Null, CLAIMED_HTTP_STATUS, None)
            .await
        {
            Ok(()) => {}
            Err(IdempotencyStoreError::AlreadyExists { .. }) => return replay_or_reject(&state, key, &request_hash).await,
            Err(err) => return Err(AppError::from(err)),
        }
    }

    let outcome = run_booking(&state, &raw).await;

    if let Some(key) = &idem_key {
        match &outcome {
            Ok(response_body) => {
                let response_json = serde_json::to_value(response_body).unwrap_or(serde_json::Value::Null);
                if let Err(err) = state
                    .idempotency
                    .complete(CREATE_RESERVATION_SCOPE, key, response_json, StatusCode::CREATED.as_u16(), None)
                    .await
                {
                    tracing::warn!(error = %err, scope = CREATE_RESERVATION_SCOPE, "failed to complete idempotency claim");
                }
            }
            Err(_) => {
                if let Err(err) = state.idempotency.release(CREATE_RESERVATION_SCOPE, key).await {
                    tracing::warn!(error = %err, scope = CREATE_RESERVATION_SCOPE, "failed to release idempotency claim after a failed booking attempt");
                }
            }
        }
    }

    Ok((StatusCode::CREATED, Json(outcome?)).into_response())
}

/// Run the booking protocol and return the response body to be rendered.
/// Kept separate from [`create_reservation`] so its `Result` can be
/// inspected (to decide `complete` vs. `release`) before the response is
/// sent.
async fn run_booking(state: &AppState, raw: &serde_json::Value) -> Result<CreateReservationResponse, AppError> {
    let body: CreateReservationRequest =
        serde_json::from_value(raw.clone()).map_err(|err| AppError::bad_request(format!("invalid request body: {err}")))?;
    let booking_request = body.into_booking_request()?;

    let result = state.coordinator.create_reservation(booking_request).await?;

    Ok(CreateReservationResponse {
        reservation_code: result.reservation_code,
        supplier_reservation_code: result.supplier_confirmation_number,
        status: "CONFIRMED",
        payment_status: "PAID",
        receipt_url: result.receipt_url,
    })
}

/// Handle a claim collision: replay the winner's completed response if the
/// hash matches, report the request as still in flight if the winner
/// hasn't finished yet, and reject outright if the hash differs.
async fn replay_or_reject(state: &AppState, key: &str, request_hash: &str) -> Result<Response, AppError> {
    let Some(record) = state.idempotency.get(CREATE_RESERVATION_SCOPE, key).await? else {
        // The winner released its claim between our failed `put` and this
        // `get` (its booking attempt failed); the key is free again.
        return Err(AppError::from(CoordinatorError::IdempotencyKeyInProgress {
            scope: CREATE_RESERVATION_SCOPE.to_string(),
        }));
    };

    if record.request_hash != request_hash {
        return Err(AppError::from(CoordinatorError::ConflictingIdempotencyKey {
            scope: CREATE_RESERVATION_SCOPE.to_string(),
        }));
    }

    if record.http_status == CLAIMED_HTTP_STATUS {
        return Err(AppError::from(CoordinatorError::IdempotencyKeyInProgress {
            scope: CREATE_RESERVATION_SCOPE.to_string(),
        }));
    }

    let status = StatusCode::from_u16(record.http_status).unwrap_or(StatusCode::OK);
    Ok((status, Json(record.response_body)).into_response())
}

#[derive(Debug, Serialize)]
struct ReservationDetailResponse {
    reservation_code: String,
    status: String,
    payment_status: String,
    supplier_reservation_code: Option<String>,
    pickup_datetime: DateTime<Utc>,
    dropoff_datetime: DateTime<Utc>,
    currency_code: String,
    public_price_total: String,
    created_at: DateTime<Utc>,
}

fn payment_status_wire(status: rental_core::domain::PaymentStatus) -> String {
    serde_json::to_value(status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

impl From<&Reservation> for ReservationDetailResponse {
    fn from(reservation: &Reservation) -> Self {
        Self {
            reservation_code: reservation.reservation_code.clone(),
            status: reservation.status.to_string(),
            payment_status: payment_status_wire(reservation.payment_status),
            supplier_reservation_code: reservation.supplier_reservation_code.clone(),
            pickup_datetime: reservation.pickup_datetime,
            dropoff_datetime: reservation.dropoff_datetime,
            currency_code: reservation.currency_code.clone(),
            public_price_total: reservation.totals.public_price_total.to_string(),
            created_at: reservation.created_at,
        }
    }
}

/// `GET /reservations/{code}` — fetch a reservation by its public code.
///
/// # Errors
///
/// Returns 404 if no reservation has that code.
pub async fn get_reservation_by_code(State(state): State<AppState>, Path(code): Path<String>) -> Result<Json<ReservationDetailResponse>, AppError> {
    let mut uow = state.uow_factory.begin().await?;
    let reservation = uow.reservations().get_by_code(&code).await?;
    uow.rollback().await?;

    let reservation = reservation.ok_or_else(|| CoordinatorError::ReservationNotFound(code.clone()))?;
    Ok(Json(ReservationDetailResponse::from(&reservation)))
}

fn default_limit() -> u32 {
    20
}

/// `GET /reservations?customer_id=…` query parameters.
#[derive(Debug, Deserialize)]
pub struct ListReservationsQuery {
    customer_id: i64,
    #[serde(default = "default_limit")]
    limit: u32,
    #[serde(default)]
    offset: u32,
}

/// Maximum page size (§6: "max 100 per page").
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Serialize)]
struct ListReservationsResponse {
    reservations: Vec<ReservationDetailResponse>,
    limit: u32,
    offset: u32,
}

/// `GET /reservations?customer_id=…` — list a customer's reservations,
/// newest first, with offset pagination.
///
/// # Errors
///
/// Returns 400 if `limit` exceeds the maximum page size.
pub async fn list_reservations(State(state): State<AppState>, Query(query): Query<ListReservationsQuery>) -> Result<Json<ListReservationsResponse>, AppError> {
    if query.limit > MAX_PAGE_SIZE {
        return Err(AppError::bad_request(format!("limit must not exceed {MAX_PAGE_SIZE}")));
    }

    let mut uow = state.uow_factory.begin().await?;
    let reservations = uow.reservations().list_by_customer(query.customer_id, query.limit, query.offset).await?;
    uow.rollback().await?;

    Ok(Json(ListReservationsResponse {
        reservations: reservations.iter().map(ReservationDetailResponse::from).collect(),
        limit: query.limit,
        offset: query.offset,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_sentinel_category_before_any_port_call() {
        let request = CreateReservationRequest {
            supplier_id: 1,
            pickup_office_id: 1,
            dropoff_office_id: 1,
            car_category_id: 0,
            vehicle_id: None,
            acriss_code: None,
            pickup_datetime: "2026-08-10T10:00:00Z".parse().unwrap(),
            dropoff_datetime: "2026-08-12T10:00:00Z".parse().unwrap(),
            price: "100.00".to_string(),
            currency_code: "EUR".to_string(),
            payment_method_id: "pm_test".to_string(),
            sales_channel_id: None,
            app_customer_id: None,
            driver: DriverRequest {
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
                email: "jane@example.com".to_string(),
                phone: None,
                date_of_birth: None,
                driver_license_number: None,
                driver_license_country: None,
            },
        };
        assert!(request.into_booking_request().is_err());
    }

    #[test]
    fn canonicalize_is_stable_regardless_of_key_order() {
        let a = serde_json::json!({"b": 1, "a": 2});
        let b = serde_json::json!({"a": 2, "b": 1});
        assert_eq!(canonicalize(&a), canonicalize(&b));
    }
}
