//! Domain errors for the fleetboot orchestrator.

use thiserror::Error;

use crate::domain::ports::{SchedulerError, StoreError};

/// Errors surfaced at the orchestrator boundary.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Invalid machine record {id}: {reason}")]
    InvalidMachineRecord { id: String, reason: String },

    #[error("Timed out waiting for role metadata of machine {machine_id} after {attempts} attempt(s)")]
    MetadataTimeout { machine_id: String, attempts: u32 },

    #[error("Timed out waiting for {expected} machine(s) to register, saw {seen}")]
    MembershipTimeout { expected: usize, seen: usize },

    #[error("Unit {unit} was not accepted after {attempts} attempt(s): {last}")]
    SubmissionExhausted {
        unit: String,
        attempts: u32,
        last: String,
    },

    #[error("Gave up marking machine {machine_id} deployed after {attempts} conflicting write(s)")]
    ConflictRetriesExhausted { machine_id: String, attempts: u32 },

    #[error("Convergence not reached: {converged}/{expected} unit(s) after {polls} poll(s)")]
    ConvergenceTimeout {
        converged: usize,
        expected: usize,
        polls: u32,
    },

    #[error("Template error: {0}")]
    Template(String),
}

impl DomainError {
    /// Returns true for errors worth retrying unchanged at a higher level
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Store(err) => err.is_transient(),
            Self::Scheduler(err) => err.is_transient(),
            _ => false,
        }
    }
}

/// Result alias for service operations
pub type DomainResult<T> = Result<T, DomainError>;
