//! Unit submission and convergence polling against the scheduler.

use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ConvergenceTarget, UnitProgress, UnitSpec, UnitState};
use crate::domain::ports::{Scheduler, SubmitOutcome};
use crate::services::retry::RetryPolicy;

/// Outcome of a successful convergence wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConvergenceReport {
    /// State queries issued, including the final one
    pub polls: u32,
    /// Units in the target state on the final poll
    pub converged: usize,
    /// Size of the target group
    pub expected: usize,
}

/// Submits units to the scheduler and waits for them to converge.
///
/// Every scheduler call is wrapped in the transient policy. Rejected
/// submissions and unconverged polls are repeated under their own policies.
pub struct ConvergencePoller {
    scheduler: Arc<dyn Scheduler>,
    transient: RetryPolicy,
    submission: RetryPolicy,
    convergence: RetryPolicy,
}

impl ConvergencePoller {
    /// Create a poller.
    ///
    /// # Arguments
    ///
    /// * `scheduler` - Scheduler port implementation
    /// * `transient` - Retry policy for unavailable-scheduler errors
    /// * `submission` - Resubmission policy for units the scheduler did not accept
    /// * `convergence` - Polling policy for the convergence wait
    pub fn new(
        scheduler: Arc<dyn Scheduler>,
        transient: RetryPolicy,
        submission: RetryPolicy,
        convergence: RetryPolicy,
    ) -> Self {
        Self {
            scheduler,
            transient,
            submission,
            convergence,
        }
    }

    /// Submit every unit, in order, until each is accepted
    pub async fn submit(&self, units: &[UnitSpec]) -> DomainResult<()> {
        for unit in units {
            self.submit_one(unit).await?;
        }
        Ok(())
    }

    #[instrument(skip(self, unit), fields(unit = %unit.name))]
    async fn submit_one(&self, unit: &UnitSpec) -> DomainResult<()> {
        let mut attempts = self.submission.start();

        loop {
            let outcome = self
                .transient
                .execute(|| self.scheduler.submit_unit(unit))
                .await?;

            match outcome {
                SubmitOutcome::Accepted => {
                    info!("unit submitted");
                    return Ok(());
                }
                SubmitOutcome::AlreadyExists => {
                    info!("unit already present in scheduler");
                    return Ok(());
                }
                SubmitOutcome::NotAccepted { status, body } => {
                    warn!(status, body = %body, attempt = attempts.count() + 1, "unit not accepted, resubmitting");
                    if !attempts.wait().await {
                        return Err(DomainError::SubmissionExhausted {
                            unit: unit.name.clone(),
                            attempts: attempts.count(),
                            last: format!("HTTP {status}: {body}"),
                        });
                    }
                }
            }
        }
    }

    /// Current scheduler report, with transient failures retried
    pub async fn unit_states(&self) -> DomainResult<Vec<UnitState>> {
        Ok(self
            .transient
            .execute(|| self.scheduler.unit_states())
            .await?)
    }

    /// Poll until every unit of `target` is in the required state.
    ///
    /// Completes on the first poll where the count of matching units equals
    /// the group size, and never before.
    #[instrument(skip(self, target), fields(target = %target))]
    pub async fn poll_until_converged(
        &self,
        target: &ConvergenceTarget,
    ) -> DomainResult<ConvergenceReport> {
        let expected = target.expected();
        let mut attempts = self.convergence.start();
        let mut polls = 0u32;

        loop {
            let states = self.unit_states().await?;
            polls += 1;
            let converged = target.count_converged(&states);

            if converged == expected {
                info!(polls, converged, expected, "units converged");
                return Ok(ConvergenceReport {
                    polls,
                    converged,
                    expected,
                });
            }

            info!(polls, converged, expected, "waiting for units to converge");
            log_pending(target, &states);

            if !attempts.wait().await {
                return Err(DomainError::ConvergenceTimeout {
                    converged,
                    expected,
                    polls,
                });
            }
        }
    }
}

fn log_pending(target: &ConvergenceTarget, states: &[UnitState]) {
    let reported: BTreeSet<&str> = states.iter().map(|s| s.unit_name.as_str()).collect();
    for name in &target.unit_group {
        let progress = target.progress_of(name, states);
        if progress != UnitProgress::Converged {
            debug!(unit = %name, ?progress, reported = reported.contains(name.as_str()), "unit pending");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ActiveState, SubState, UnitGroup};
    use crate::infrastructure::memory::InMemoryScheduler;
    use std::time::Duration;

    fn poller(scheduler: Arc<InMemoryScheduler>, max_attempts: Option<u32>) -> ConvergencePoller {
        let fast = RetryPolicy::fixed(Duration::from_millis(1)).with_max_attempts(max_attempts);
        ConvergencePoller::new(scheduler, RetryPolicy::no_retry(), fast.clone(), fast)
    }

    fn state(name: &str, active: &str, sub: &str) -> UnitState {
        UnitState {
            unit_name: name.to_string(),
            machine_id: "a".to_string(),
            active_state: ActiveState::from(active),
            sub_state: SubState::from(sub),
            load_state: Some("loaded".to_string()),
            hash: None,
        }
    }

    fn role_target(names: &[&str]) -> ConvergenceTarget {
        ConvergenceTarget::new(
            names.iter().map(ToString::to_string),
            ActiveState::Active,
            SubState::Running,
        )
    }

    #[tokio::test]
    async fn test_submit_retries_until_accepted() {
        let scheduler = Arc::new(InMemoryScheduler::new());
        scheduler.reject_next(2);
        let unit = UnitSpec::new("minion-proxy@a.service", UnitGroup::Role, b"[Unit]\n".to_vec());

        poller(Arc::clone(&scheduler), None)
            .submit(std::slice::from_ref(&unit))
            .await
            .unwrap();

        assert_eq!(scheduler.submissions().len(), 3);
        assert_eq!(scheduler.units(), vec!["minion-proxy@a.service"]);
    }

    #[tokio::test]
    async fn test_submit_exhausts_policy() {
        let scheduler = Arc::new(InMemoryScheduler::new());
        scheduler.reject_next(10);
        let unit = UnitSpec::new("minion-proxy@a.service", UnitGroup::Role, vec![]);

        let err = poller(Arc::clone(&scheduler), Some(2))
            .submit(&[unit])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::SubmissionExhausted { attempts: 2, .. }
        ));
        assert_eq!(scheduler.submissions().len(), 2);
    }

    #[tokio::test]
    async fn test_resubmission_is_idempotent() {
        let scheduler = Arc::new(InMemoryScheduler::new());
        let unit = UnitSpec::new("minion-proxy@a.service", UnitGroup::Role, vec![]);
        let poller = poller(Arc::clone(&scheduler), Some(1));

        poller.submit(std::slice::from_ref(&unit)).await.unwrap();
        poller.submit(std::slice::from_ref(&unit)).await.unwrap();

        assert_eq!(scheduler.units().len(), 1);
    }

    #[tokio::test]
    async fn test_converges_after_exactly_k_polls() {
        let scheduler = Arc::new(InMemoryScheduler::new());
        scheduler.push_states(vec![]);
        scheduler.push_states(vec![state("a.service", "activating", "start")]);
        scheduler.push_states(vec![
            state("a.service", "active", "running"),
            state("b.service", "inactive", "dead"),
        ]);
        scheduler.push_states(vec![
            state("a.service", "active", "running"),
            state("b.service", "active", "running"),
        ]);

        let report = poller(Arc::clone(&scheduler), None)
            .poll_until_converged(&role_target(&["a.service", "b.service"]))
            .await
            .unwrap();

        assert_eq!(
            report,
            ConvergenceReport {
                polls: 4,
                converged: 2,
                expected: 2
            }
        );
        assert_eq!(scheduler.polls(), 4);
    }

    #[tokio::test]
    async fn test_wrong_sub_state_does_not_count() {
        let scheduler = Arc::new(InMemoryScheduler::new());
        scheduler.push_states(vec![state("a.service", "active", "exited")]);

        let err = poller(scheduler, Some(3))
            .poll_until_converged(&role_target(&["a.service"]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::ConvergenceTimeout {
                converged: 0,
                expected: 1,
                polls: 3
            }
        ));
    }

    #[tokio::test]
    async fn test_times_out_while_units_are_unreported() {
        let scheduler = Arc::new(InMemoryScheduler::new());
        let submitted = "a.service".to_string();
        let target = role_target(&["a.service", "b.service"]).with_submitted([&submitted]);

        let err = poller(Arc::clone(&scheduler), Some(2))
            .poll_until_converged(&target)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::ConvergenceTimeout {
                converged: 0,
                expected: 2,
                polls: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_target_converges_immediately() {
        let scheduler = Arc::new(InMemoryScheduler::new());
        let report = poller(Arc::clone(&scheduler), Some(1))
            .poll_until_converged(&role_target(&[]))
            .await
            .unwrap();
        assert_eq!(report.polls, 1);
        assert_eq!(report.expected, 0);
    }
}
