//! # Biller Types
//!
//! Domain types and port traits for the host-to-host biller gateway.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Bill, PaymentStatus)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Wire contract spoken with collecting-agent banks
//! - `config/` - Immutable gateway configuration (allow-lists, shared secret)
//! - `security/` - H2H checksum primitives
//! - `error/` - Domain, repository and gateway error types

pub mod config;
pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;
pub mod security;

// Re-export commonly used types
pub use config::{GatewayConfig, SettlementFailurePolicy};
pub use domain::{Bill, PaymentStatus};
pub use dto::*;
pub use error::{DomainError, GatewayError, RepoError};
pub use ports::{AuditSink, BillRepository, SettleOutcome};
