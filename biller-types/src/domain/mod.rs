//! Domain models for the biller gateway.

pub mod bill;

pub use bill::{Bill, PaymentStatus};
