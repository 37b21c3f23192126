//! HTTP-backed adapters for the `PaymentGateway` and `SupplierGateway` ports.
//!
//! Both families share the same shape: a pooled `reqwest::Client`, structured
//! per-call logging, and a policy for turning transport failures into the
//! port's error taxonomy rather than letting them propagate as panics.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod stripe;
pub mod supplier;

pub use stripe::StripePaymentGateway;
pub use supplier::base::BaseSupplierClient;
pub use supplier::factory::SupplierGatewayFactory;
pub use supplier::generic::GenericRestSupplierGateway;
