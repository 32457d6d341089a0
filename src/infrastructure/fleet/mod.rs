//! fleet HTTP adapter for the scheduler port

pub mod client;
pub mod types;

pub use client::{FleetClientConfig, FleetScheduler};
pub use types::{parse_unit_file, UnitOption};
