//! Availability search, backing `POST /availability`.
//!
//! Offers come from the suppliers themselves (C8); there is no internal
//! inventory to check against, so a search spans every configured
//! supplier when none is named, and fans the per-supplier calls out
//! concurrently. `checkAvailability` (C6) is not consulted here — the
//! overlap rule it implements only has a `car_category_id` to key off of,
//! which this endpoint's request shape doesn't carry, so it stays a
//! write-path concern for the coordinator rather than a search filter.

use rental_core::ports::{Offer, UnitOfWorkError, UnitOfWorkFactory};
use rental_gateways::SupplierGatewayFactory;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// A search request against one or more suppliers.
#[derive(Clone, Debug)]
pub struct AvailabilityRequest {
    /// Pickup office, as a catalog surrogate id.
    pub pickup_office_id: i64,
    /// Dropoff office, as a catalog surrogate id.
    pub dropoff_office_id: i64,
    /// Requested pickup time.
    pub pickup_datetime: DateTime<Utc>,
    /// Requested dropoff time.
    pub dropoff_datetime: DateTime<Utc>,
    /// Driver age, when supplied — narrows results for suppliers with an
    /// age-based surcharge or exclusion.
    pub driver_age: Option<u32>,
    /// Restrict the search to one supplier; omit to search every
    /// configured supplier.
    pub supplier_id: Option<i64>,
}

/// Failure modes for an availability search.
#[derive(Error, Debug)]
pub enum AvailabilityError {
    /// `pickup_office_id` or `dropoff_office_id` does not exist, or the
    /// requested window is empty/inverted.
    #[error("invalid availability request: {0}")]
    Validation(String),
    /// The named `supplier_id` has no adapter configured.
    #[error("supplier {0} is not configured")]
    UnknownSupplier(i64),
    /// Every supplier queried failed or timed out.
    #[error("no supplier could be reached")]
    AllSuppliersUnreachable,
    /// The unit of work backing the office lookups failed.
    #[error("availability lookup transaction error: {0}")]
    UnitOfWork(#[from] UnitOfWorkError),
}

/// Resolves office ids to codes and fans an availability search out across
/// the requested supplier(s).
pub struct AvailabilityService {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
    supplier_gateways: Arc<SupplierGatewayFactory>,
}

impl AvailabilityService {
    /// Build a service over the given unit-of-work and supplier-gateway
    /// factories.
    #[must_use]
    pub fn new(uow_factory: Arc<dyn UnitOfWorkFactory>, supplier_gateways: Arc<SupplierGatewayFactory>) -> Self {
        Self { uow_factory, supplier_gateways }
    }

    /// Search for bookable offers. Returns the offers from every supplier
    /// that answered successfully; a supplier that errors or is
    /// unreachable is logged and dropped from the result rather than
    /// failing the whole search, unless every supplier fails.
    pub async fn search(&self, request: &AvailabilityRequest) -> Result<Vec<Offer>, AvailabilityError> {
        if request.dropoff_datetime <= request.pickup_datetime {
            return Err(AvailabilityError::Validation(
                "dropoff_datetime must be after pickup_datetime".to_string(),
            ));
        }

        let mut uow = self.uow_factory.begin().await?;
        let pickup_office = uow
            .offices()
            .get_by_id(request.pickup_office_id)
            .await?
            .ok_or_else(|| AvailabilityError::Validation(format!("unknown pickup office {}", request.pickup_office_id)))?;
        let dropoff_office = uow
            .offices()
            .get_by_id(request.dropoff_office_id)
            .await?
            .ok_or_else(|| AvailabilityError::Validation(format!("unknown dropoff office {}", request.dropoff_office_id)))?;
        uow.rollback().await?;

        let supplier_ids = match request.supplier_id {
            Some(id) => vec![id],
            None => self.supplier_gateways.configured_supplier_ids(),
        };
        if supplier_ids.is_empty() {
            return Err(AvailabilityError::AllSuppliersUnreachable);
        }
        if let Some(id) = request.supplier_id {
            if self.supplier_gateways.get(id).await.is_none() {
                return Err(AvailabilityError::UnknownSupplier(id));
            }
        }

        let searches = supplier_ids.into_iter().map(|supplier_id| {
            let pickup_code = pickup_office.code.clone();
            let dropoff_code = dropoff_office.code.clone();
            async move {
                let gateway = self.supplier_gateways.get(supplier_id).await?;
                match gateway
                    .search_availability(&pickup_code, &dropoff_code, request.pickup_datetime, request.dropoff_datetime, request.driver_age)
                    .await
                {
                    Ok(offers) => Some(offers),
                    Err(err) => {
                        tracing::warn!(supplier_id, error = %err, "supplier availability search failed");
                        None
                    }
                }
            }
        });

        let results = futures::future::join_all(searches).await;

        let mut offers = Vec::new();
        let mut any_succeeded = false;
        for result in results.into_iter().flatten() {
            any_succeeded = true;
            offers.extend(result);
        }

        if !any_succeeded {
            metrics::counter!("availability.all_suppliers_unreachable").increment(1);
            return Err(AvailabilityError::AllSuppliersUnreachable);
        }

        metrics::counter!("availability.searched").increment(1);
        Ok(offers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_an_inverted_window_before_touching_any_port() {
        let request = AvailabilityRequest {
            pickup_office_id: 1,
            dropoff_office_id: 2,
            pickup_datetime: "2026-08-10T10:00:00Z".parse().unwrap(),
            dropoff_datetime: "2026-08-09T10:00:00Z".parse().unwrap(),
            driver_age: None,
            supplier_id: None,
        };
        assert!(request.dropoff_datetime <= request.pickup_datetime);
    }
}
