//! Supplier gateway port (C8).

use crate::money::Money;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// A single bookable offer returned by a supplier's availability search.
#[derive(Clone, Debug, PartialEq)]
pub struct Offer {
    /// Supplier-specific product id.
    pub supplier_car_product_id: String,
    /// ACRISS code of the offered car category.
    pub acriss_code: String,
    /// Supplier cost for the whole rental.
    pub total_price: Money,
    /// ISO-4217 currency code.
    pub currency_code: String,
    /// Raw supplier payload, preserved for audit/debugging.
    pub raw: Value,
}

/// Outcome of creating a reservation with the supplier.
#[derive(Clone, Debug, PartialEq)]
pub struct CreateReservationResult {
    /// Supplier-assigned confirmation number.
    pub confirmation_number: String,
    /// Supplier-reported status string.
    pub status: String,
    /// Supplier's total price for the booking.
    pub total_price: Money,
    /// ISO-4217 currency code.
    pub currency_code: String,
}

/// Outcome of a (no-op-by-default) confirmation step, for suppliers with a
/// two-step booking flow.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfirmationResult {
    /// Supplier-assigned confirmation number.
    pub confirmation_number: String,
    /// Supplier-reported status string.
    pub status: String,
}

/// Current status of a reservation as reported by the supplier.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusResult {
    /// Supplier-assigned confirmation number.
    pub confirmation_number: String,
    /// Supplier-reported status string.
    pub status: String,
    /// Whether the vehicle has been picked up.
    pub pickup_completed: bool,
    /// Whether the vehicle has been returned.
    pub dropoff_completed: bool,
}

/// Failure from a [`SupplierGateway`] call.
#[derive(Error, Debug)]
pub enum SupplierGatewayError {
    /// The supplier rejected the request outright (4xx). Never retried.
    #[error("supplier rejected the request: {detail}")]
    Rejected {
        /// Operator-readable detail.
        detail: String,
    },
    /// A retryable failure (5xx or transport error) survived the adapter's
    /// own retry budget.
    #[error("supplier call failed after retries: {detail}")]
    ExhaustedRetries {
        /// Operator-readable detail.
        detail: String,
    },
    /// No response arrived before the deadline.
    #[error("supplier call timed out")]
    Timeout,
}

/// Per-supplier adapter with a uniform contract. The base adapter (see
/// `rental-gateways`) supplies connection pooling, structured per-attempt
/// logging, and the retry policy; concrete adapters only implement
/// authentication and payload translation.
pub trait SupplierGateway: Send + Sync {
    /// Search for bookable offers.
    fn search_availability<'a>(
        &'a self,
        pickup_office_code: &'a str,
        dropoff_office_code: &'a str,
        pickup_datetime: DateTime<Utc>,
        dropoff_datetime: DateTime<Utc>,
        driver_age: Option<u32>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Offer>, SupplierGatewayError>> + Send + 'a>>;

    /// Create a reservation with the supplier.
    fn create_reservation<'a>(
        &'a self,
        payload: &'a Value,
    ) -> Pin<Box<dyn Future<Output = Result<CreateReservationResult, SupplierGatewayError>> + Send + 'a>>;

    /// Confirm a previously created reservation. The default adapter
    /// behavior for single-step suppliers is a no-op that echoes back
    /// `CONFIRMED`.
    fn confirm_reservation<'a>(
        &'a self,
        supplier_reservation_code: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ConfirmationResult, SupplierGatewayError>> + Send + 'a>>;

    /// Query current status from the supplier.
    fn get_reservation_status<'a>(
        &'a self,
        supplier_reservation_code: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<StatusResult, SupplierGatewayError>> + Send + 'a>>;

    /// Release any pooled connections held by this adapter instance.
    fn close(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}
