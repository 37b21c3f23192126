//! Port traits the coordinator depends on (C6–C8): persistence, payment,
//! and supplier gateways. `rental-postgres` and `rental-gateways` provide
//! the implementations; `rental-testing` provides in-memory doubles.
//!
//! Every trait here is written to be dyn-compatible: methods return
//! `Pin<Box<dyn Future<...> + Send + '_>>` instead of using `async fn`, so
//! the coordinator can hold `Arc<dyn PaymentGateway>` /
//! `Box<dyn UnitOfWork>` without a generic parameter per adapter.

mod payment_gateway;
mod supplier_gateway;
mod uow;

pub use payment_gateway::{PaymentErrorSource, PaymentGateway, PaymentGatewayError, PaymentResult};
pub use supplier_gateway::{
    ConfirmationResult, CreateReservationResult, Offer, StatusResult, SupplierGateway, SupplierGatewayError,
};
pub use uow::{
    CustomerRepo, CustomerRow, OfficeRepo, OfficeRow, OutboxHandle, PaymentRepo, ReservationRepo, SupplierRepo,
    SupplierRequestRepo, SupplierRow, UnitOfWork, UnitOfWorkError, UnitOfWorkFactory,
};
