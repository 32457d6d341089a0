//! Orchestration services, built on the domain ports

pub mod convergence_poller;
pub mod deployment_tracker;
pub mod membership_watcher;
pub mod orchestrator;
pub mod retry;
pub mod unit_renderer;

pub use convergence_poller::{ConvergencePoller, ConvergenceReport};
pub use deployment_tracker::DeploymentTracker;
pub use membership_watcher::MembershipWatcher;
pub use orchestrator::{GroupReport, MachineOutcome, MachineReport, Orchestrator, RunReport};
pub use retry::{RetryPolicy, WaitPolicies};
pub use unit_renderer::UnitRenderer;
