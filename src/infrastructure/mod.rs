//! Infrastructure layer module
//!
//! This module contains the adapters and external integrations:
//! - etcd v2 key-value store client and peer admin client
//! - fleet scheduler HTTP client
//! - In-memory store and scheduler
//! - Unit template loading and writing
//! - Configuration management
//! - Logging infrastructure
//!
//! Adapters satisfy the port traits defined in the domain layer.

pub mod config;
pub mod etcd;
pub mod fleet;
pub mod logging;
pub mod memory;
pub mod templates;
