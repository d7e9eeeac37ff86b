//! # Biller Hex
//!
//! Application service layer and HTTP adapter for the H2H biller gateway.
//!
//! ## Architecture
//!
//! - `validator` - Completeness, allow-list and checksum checks
//! - `service` - Application service (Inquiry and Payment orchestration)
//! - `audit` - `tracing`-backed audit sink
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! The service is generic over `R: BillRepository`, allowing
//! different repository implementations to be injected.

pub mod audit;
pub mod inbound;
pub mod openapi;
pub mod service;
pub mod validator;

#[cfg(test)]
mod service_tests;

pub use audit::TracingAuditSink;
pub use service::BillerService;
pub use validator::RequestValidator;
