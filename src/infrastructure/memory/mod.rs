//! In-process adapters for the store and scheduler ports
//!
//! Used by tests and by dry runs that must not touch a live cluster.

pub mod scheduler;
pub mod store;

pub use scheduler::InMemoryScheduler;
pub use store::InMemoryStore;
