//! Route table: binds handlers to the `/api/v1` surface plus health probes.

use crate::handlers::{availability, health, reservations};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

/// Build the full router for the reservation API, wired to `state`.
#[must_use]
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/availability", post(availability::search_offers))
        .route("/reservations", post(reservations::create_reservation).get(reservations::list_reservations))
        .route("/reservations/:code", get(reservations::get_reservation_by_code));

    let health_routes = Router::new()
        .route("/health", get(health::live))
        .route("/health/live", get(health::live))
        .route("/health/ready", get(health::ready));

    Router::new()
        .nest("/api/v1", api)
        .merge(health_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        use rental_core::ports::PaymentResult;
        use rental_gateways::SupplierGatewayFactory;
        use rental_runtime::{AvailabilityService, CoordinatorConfig, ReservationCommitCoordinator};
        use rental_testing::mocks::test_clock;
        use rental_testing::in_memory::InMemoryUnitOfWorkFactory;
        use rental_testing::stubs::{InMemoryIdempotencyStore, StubPaymentGateway};
        use std::sync::Arc;

        let uow_factory = Arc::new(InMemoryUnitOfWorkFactory::new());
        let clock = Arc::new(test_clock());
        let payment_gateway = Arc::new(StubPaymentGateway::succeeding(PaymentResult {
            success: true,
            payment_intent_id: "pi_test".to_string(),
            charge_id: Some("ch_test".to_string()),
            amount: rental_core::money::Money::from_cents(0),
            currency_code: "EUR".to_string(),
        }));
        let supplier_gateways = Arc::new(SupplierGatewayFactory::new(vec![]));
        let coordinator = Arc::new(ReservationCommitCoordinator::new(
            uow_factory.clone(),
            payment_gateway,
            supplier_gateways.clone(),
            clock,
            CoordinatorConfig { payment_provider_name: "STRIPE".to_string() },
        ));
        let availability = Arc::new(AvailabilityService::new(uow_factory.clone(), supplier_gateways));
        let idempotency = Arc::new(InMemoryIdempotencyStore::new());

        AppState::new(coordinator, availability, uow_factory, idempotency)
    }

    #[tokio::test]
    async fn liveness_route_responds_ok() {
        let app = router(test_state());
        let response = app.oneshot(Request::builder().uri("/health/live").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
