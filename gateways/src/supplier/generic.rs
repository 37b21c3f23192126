//! A single-step REST supplier adapter: API-key authentication, one
//! `/availability` search endpoint and one `/reservations` create endpoint.
//! `confirm_reservation`/`get_reservation_status` use the base adapter's
//! no-op defaults since this class of supplier confirms at creation time.

use crate::supplier::base::BaseSupplierClient;
use chrono::{DateTime, Utc};
use rental_core::money::Money;
use rental_core::ports::{
    ConfirmationResult, CreateReservationResult, Offer, StatusResult, SupplierGateway, SupplierGatewayError,
};
use reqwest::Method;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Adapter for suppliers exposing a plain REST API keyed by an API key
/// header, with a single-step (create-confirms-immediately) booking flow.
pub struct GenericRestSupplierGateway {
    http: BaseSupplierClient,
    api_key: String,
}

impl GenericRestSupplierGateway {
    /// Construct an adapter for the supplier identified by `supplier_id`,
    /// talking to `base_url` and authenticating with `api_key`.
    #[must_use]
    pub fn new(supplier_id: i64, supplier_name: impl Into<String>, base_url: impl Into<String>, api_key: impl Into<String>, max_retries: u32) -> Self {
        Self {
            http: BaseSupplierClient::new(supplier_id, supplier_name, base_url, Duration::from_secs(30), max_retries),
            api_key: api_key.into(),
        }
    }
}

impl SupplierGateway for GenericRestSupplierGateway {
    fn search_availability<'a>(
        &'a self,
        pickup_office_code: &'a str,
        dropoff_office_code: &'a str,
        pickup_datetime: DateTime<Utc>,
        dropoff_datetime: DateTime<Utc>,
        driver_age: Option<u32>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Offer>, SupplierGatewayError>> + Send + 'a>> {
        Box::pin(async move {
            let api_key = self.api_key.clone();
            let response = self
                .http
                .request_with_retry(Method::GET, "/availability", move |builder| {
                    let mut builder = builder
                        .header("X-Api-Key", api_key.clone())
                        .query(&[
                            ("pickup_office_code", pickup_office_code),
                            ("dropoff_office_code", dropoff_office_code),
                            ("pickup_datetime", &pickup_datetime.to_rfc3339()),
                            ("dropoff_datetime", &dropoff_datetime.to_rfc3339()),
                        ]);
                    if let Some(age) = driver_age {
                        builder = builder.query(&[("driver_age", age)]);
                    }
                    builder
                })
                .await?;

            let body: Value = response.json().await.map_err(|err| SupplierGatewayError::ExhaustedRetries {
                detail: format!("failed to decode availability response: {err}"),
            })?;

            let offers = body.get("offers").and_then(Value::as_array).cloned().unwrap_or_default();
            offers
                .into_iter()
                .map(|raw| {
                    let supplier_car_product_id = raw
                        .get("product_id")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    let acriss_code = raw.get("acriss_code").and_then(Value::as_str).unwrap_or_default().to_string();
                    let total_price_cents = raw.get("total_price_cents").and_then(Value::as_i64).unwrap_or(0);
                    let currency_code = raw
                        .get("currency_code")
                        .and_then(Value::as_str)
                        .unwrap_or("USD")
                        .to_string();
                    Ok(Offer {
                        supplier_car_product_id,
                        acriss_code,
                        total_price: Money::from_cents(total_price_cents),
                        currency_code,
                        raw: raw.clone(),
                    })
                })
                .collect()
        })
    }

    fn create_reservation<'a>(
        &'a self,
        payload: &'a Value,
    ) -> Pin<Box<dyn Future<Output = Result<CreateReservationResult, SupplierGatewayError>> + Send + 'a>> {
        Box::pin(async move {
            let api_key = self.api_key.clone();
            let payload = payload.clone();
            let response = self
                .http
                .request_with_retry(Method::POST, "/reservations", move |builder| {
                    builder.header("X-Api-Key", api_key.clone()).json(&payload)
                })
                .await?;

            let body: Value = response.json().await.map_err(|err| SupplierGatewayError::ExhaustedRetries {
                detail: format!("failed to decode create-reservation response: {err}"),
            })?;

            let confirmation_number = body
                .get("confirmation_number")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let status = body.get("status").and_then(Value::as_str).unwrap_or("CONFIRMED").to_string();
            let total_price_cents = body.get("total_price_cents").and_then(Value::as_i64).unwrap_or(0);
            let currency_code = body
                .get("currency_code")
                .and_then(Value::as_str)
                .unwrap_or("USD")
                .to_string();

            Ok(CreateReservationResult {
                confirmation_number,
                status,
                total_price: Money::from_cents(total_price_cents),
                currency_code,
            })
        })
    }

    fn confirm_reservation<'a>(
        &'a self,
        supplier_reservation_code: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ConfirmationResult, SupplierGatewayError>> + Send + 'a>> {
        Box::pin(async move {
            Ok(ConfirmationResult {
                confirmation_number: supplier_reservation_code.to_string(),
                status: "CONFIRMED".to_string(),
            })
        })
    }

    fn get_reservation_status<'a>(
        &'a self,
        supplier_reservation_code: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<StatusResult, SupplierGatewayError>> + Send + 'a>> {
        Box::pin(async move {
            Ok(StatusResult {
                confirmation_number: supplier_reservation_code.to_string(),
                status: "CONFIRMED".to_string(),
                pickup_completed: false,
                dropoff_completed: false,
            })
        })
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async {})
    }
}
