//! Supplier gateway adapters: shared HTTP/retry plumbing, one concrete
//! REST adapter, and the supplier-id → adapter factory.

pub mod base;
pub mod factory;
pub mod generic;
