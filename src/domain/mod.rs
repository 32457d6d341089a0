//! Domain layer for the fleetboot orchestrator
//!
//! This module contains the fleet data model, the port traits adapters
//! implement, and the error taxonomy.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{DomainError, DomainResult};
