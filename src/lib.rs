//! fleetboot - cluster bootstrap convergence orchestrator
//!
//! fleetboot discovers fleet machines from an etcd key-value store, waits for
//! each one to publish its cluster role, renders that role's systemd units
//! from templates, submits them to the fleet scheduler, records the machine
//! as deployed, and polls until every unit reaches its target state.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and the store/scheduler ports
//! - **Service Layer** (`services`): membership, rendering, deployment record,
//!   convergence polling and the orchestrator that sequences them
//! - **Infrastructure Layer** (`infrastructure`): etcd and fleet HTTP adapters,
//!   in-memory adapters, templates, configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use fleetboot::infrastructure::memory::{InMemoryScheduler, InMemoryStore};
//! use fleetboot::{Config, Orchestrator, TemplateSet, WaitPolicies};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let orchestrator = Orchestrator::new(
//!         Arc::new(InMemoryStore::new()),
//!         Arc::new(InMemoryScheduler::converging()),
//!         TemplateSet::builtin(),
//!         &config,
//!         &WaitPolicies::from_config(&config),
//!     );
//!     let report = orchestrator.run().await?;
//!     println!("{} machine(s)", report.machines.len());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Config, ConvergenceTarget, DeploymentRecord, LoggingConfig, MachineRecord, PollingConfig,
    RetryConfig, Role, SchedulerConfig, StoreConfig, TemplateSet, UnitGroup, UnitSpec, UnitState,
};
pub use domain::ports::{KeyValueStore, Scheduler, SchedulerError, StoreError};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    ConvergencePoller, DeploymentTracker, MembershipWatcher, Orchestrator, RetryPolicy, RunReport,
    UnitRenderer, WaitPolicies,
};
