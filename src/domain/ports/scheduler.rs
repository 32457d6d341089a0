use crate::domain::models::{UnitSpec, UnitState};
use crate::domain::ports::errors::SchedulerError;
use async_trait::async_trait;

/// Scheduler's answer to a unit submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The canonical "accepted" response
    Accepted,
    /// The unit already exists with this name; resubmission is a no-op
    AlreadyExists,
    /// Anything else; the caller decides whether to retry
    NotAccepted {
        /// HTTP status returned
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },
}

/// Cluster scheduler port: submit a unit, query unit state
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Submit one unit with desired state "launched"
    async fn submit_unit(&self, unit: &UnitSpec) -> Result<SubmitOutcome, SchedulerError>;

    /// Current per-unit state as reported by the scheduler
    async fn unit_states(&self) -> Result<Vec<UnitState>, SchedulerError>;
}
