//! Shared types, errors, and configuration for the Argent ledger core.
//!
//! This crate provides common types used across all other crates:
//! - Currency types backing decimal-precision money
//! - Typed IDs for type-safe entity references
//! - The identifier mint for account numbers and transaction ids
//! - Pagination types for list queries
//! - The ledger-wide error taxonomy
//! - Configuration management
//! - Caller identity consumed by the engine's authorization contract

pub mod auth;
pub mod config;
pub mod error;
pub mod types;

pub use auth::{Caller, Role};
pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
