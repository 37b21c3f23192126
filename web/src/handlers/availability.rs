//! `POST /availability` — search offers (§6).

use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use rental_core::ports::Offer;
use rental_runtime::AvailabilityRequest;
use serde::{Deserialize, Serialize};

/// `POST /availability` request body.
#[derive(Debug, Deserialize)]
pub struct SearchOffersRequest {
    pickup_office_id: i64,
    dropoff_office_id: i64,
    pickup_datetime: DateTime<Utc>,
    dropoff_datetime: DateTime<Utc>,
    driver_age: Option<u32>,
    supplier_id: Option<i64>,
}

impl From<SearchOffersRequest> for AvailabilityRequest {
    fn from(body: SearchOffersRequest) -> Self {
        Self {
            pickup_office_id: body.pickup_office_id,
            dropoff_office_id: body.dropoff_office_id,
            pickup_datetime: body.pickup_datetime,
            dropoff_datetime: body.dropoff_datetime,
            driver_age: body.driver_age,
            supplier_id: body.supplier_id,
        }
    }
}

/// A single offer, rendered for the wire.
#[derive(Debug, Serialize)]
pub struct OfferResponse {
    supplier_car_product_id: String,
    acriss_code: String,
    total_price: String,
    currency_code: String,
}

impl From<Offer> for OfferResponse {
    fn from(offer: Offer) -> Self {
        Self {
            supplier_car_product_id: offer.supplier_car_product_id,
            acriss_code: offer.acriss_code,
            total_price: offer.total_price.to_string(),
            currency_code: offer.currency_code,
        }
    }
}

/// `POST /availability` response body.
#[derive(Debug, Serialize)]
pub struct SearchOffersResponse {
    offers: Vec<OfferResponse>,
}

/// Search for bookable offers across one or more suppliers.
///
/// # Errors
///
/// Returns 400 on a malformed request, 404 if the search came back with no
/// offers, and 503 if every configured supplier failed or was unreachable.
pub async fn search_offers(
    State(state): State<AppState>,
    Json(body): Json<SearchOffersRequest>,
) -> Result<(StatusCode, Json<SearchOffersResponse>), AppError> {
    let request: AvailabilityRequest = body.into();
    let offers = state.availability.search(&request).await?;

    if offers.is_empty() {
        return Err(AppError::no_offers());
    }

    Ok((
        StatusCode::OK,
        Json(SearchOffersResponse {
            offers: offers.into_iter().map(OfferResponse::from).collect(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_response_formats_money_with_two_decimals() {
        let offer = Offer {
            supplier_car_product_id: "SUP-1".to_string(),
            acriss_code: "ECMR".to_string(),
            total_price: rental_core::money::Money::from_cents(150_000),
            currency_code: "EUR".to_string(),
            raw: serde_json::json!({}),
        };
        let response = OfferResponse::from(offer);
        assert_eq!(response.total_price, "1500.00");
    }
}
