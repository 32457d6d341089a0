//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that infrastructure adapters must implement:
//! - KeyValueStore: versioned key reads, conditional writes and directory listings
//! - Scheduler: unit submission and unit state queries
//!
//! These traits keep the orchestration services independent of the etcd and
//! fleet HTTP APIs.

pub mod errors;
pub mod key_value_store;
pub mod scheduler;

pub use errors::{SchedulerError, StoreError};
pub use key_value_store::{ExpectedVersion, KeyValueStore, StoreNode, VersionedValue};
pub use scheduler::{Scheduler, SubmitOutcome};
