//! The `Reservation` aggregate and its children.
//!
//! `Reservation` is the only aggregate root in this crate: drivers,
//! contacts, and pricing line items are reachable only through it, and
//! callers mutate status, payment status, and supplier confirmation only
//! through its methods so that invariants and domain events stay in sync.

mod contact;
mod driver;
mod payment;
mod pricing_item;
mod reservation;
mod supplier_request;

pub use contact::{Contact, ContactType};
pub use driver::Driver;
pub use payment::{Payment, PaymentError, PaymentStatus};
pub use pricing_item::{PricingItem, PricingItemType};
pub use reservation::{MarketingAttribution, Reservation, Snapshots, Totals};
pub use supplier_request::{SupplierRequestAudit, SupplierRequestOutcome};
