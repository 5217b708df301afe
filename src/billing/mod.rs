//! Tenant-scoped entity store, association layer and dashboard aggregation.

pub mod associate;
pub mod bill;
pub mod blob;
pub mod company;
pub mod dashboard;
pub mod error;
pub mod user;
pub mod vendor;

pub use error::BillingError;
