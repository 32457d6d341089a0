//! Sequential bootstrap pass over every fleet member.
//!
//! Discover members, wait for each one's role, render and submit its units
//! unless the deployment record already lists it, record it, then poll the
//! scheduler until every expected unit reaches its target state. Machines
//! are handled one at a time, in ID order.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    addresses_for_role, Config, ConvergenceTarget, MachineRecord, Role, TemplateSet, UnitGroup,
    UnitSpec,
};
use crate::domain::ports::{KeyValueStore, Scheduler};
use crate::services::convergence_poller::ConvergencePoller;
use crate::services::deployment_tracker::DeploymentTracker;
use crate::services::membership_watcher::MembershipWatcher;
use crate::services::retry::WaitPolicies;
use crate::services::unit_renderer::UnitRenderer;

/// What the pass did with one machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineOutcome {
    /// Units submitted and machine recorded in this pass
    Deployed,
    /// Already recorded by an earlier pass; nothing submitted
    AlreadyDeployed,
    /// Published role maps to no unit set
    Skipped,
}

/// Per-machine line of a [`RunReport`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineReport {
    /// Fleet machine ID
    pub machine_id: String,
    /// Address the machine published
    pub public_address: String,
    /// Role resolved from its metadata
    pub role: Role,
    /// What the pass did with the machine
    pub outcome: MachineOutcome,
    /// Unit names expected to converge for this machine
    pub units: Vec<String>,
}

/// Convergence result for one unit group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupReport {
    /// Download or role group
    pub group: UnitGroup,
    /// Scheduler state queries issued for this group
    pub polls: u32,
    /// Units in the target state on the final poll
    pub converged: usize,
    /// Units in the group
    pub expected: usize,
}

/// Summary of one orchestrator pass
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// When the pass began
    pub started_at: DateTime<Utc>,
    /// When the last group converged
    pub finished_at: DateTime<Utc>,
    /// One entry per fleet member, in ID order
    pub machines: Vec<MachineReport>,
    /// Public addresses of the control-plane machines
    pub control_plane_addresses: Vec<String>,
    /// Public addresses of the worker machines
    pub worker_addresses: Vec<String>,
    /// One entry per converged group, download first
    pub convergence: Vec<GroupReport>,
}

impl RunReport {
    /// Number of machines with the given outcome
    pub fn count(&self, outcome: MachineOutcome) -> usize {
        self.machines.iter().filter(|m| m.outcome == outcome).count()
    }

    /// Outcome for one machine, if it was part of the pass
    pub fn outcome_of(&self, machine_id: &str) -> Option<MachineOutcome> {
        self.machines
            .iter()
            .find(|m| m.machine_id == machine_id)
            .map(|m| m.outcome)
    }
}

/// Runs the bootstrap pass over the membership, renderer, tracker and poller.
///
/// Holds no state between passes; every pass re-reads the store.
pub struct Orchestrator {
    watcher: MembershipWatcher,
    renderer: UnitRenderer,
    tracker: DeploymentTracker,
    poller: ConvergencePoller,
    machine_count: usize,
}

impl Orchestrator {
    /// Build the orchestrator and its components.
    ///
    /// # Arguments
    ///
    /// * `store` - Key-value store holding membership and the deployment record
    /// * `scheduler` - Scheduler that receives units
    /// * `templates` - Unit templates per role
    /// * `config` - Store keys and the machine-count gate
    /// * `policies` - Retry and wait policies for every waiting operation
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        scheduler: Arc<dyn Scheduler>,
        templates: TemplateSet,
        config: &Config,
        policies: &WaitPolicies,
    ) -> Self {
        Self {
            watcher: MembershipWatcher::new(
                Arc::clone(&store),
                &config.store,
                policies.transient.clone(),
                policies.metadata.clone(),
            ),
            renderer: UnitRenderer::new(templates),
            tracker: DeploymentTracker::new(
                store,
                config.store.deployed_key.clone(),
                policies.transient.clone(),
                policies.conflict.clone(),
            ),
            poller: ConvergencePoller::new(
                scheduler,
                policies.transient.clone(),
                policies.submission.clone(),
                policies.convergence.clone(),
            ),
            machine_count: config.machine_count,
        }
    }

    /// Wait for at least `count` registered machines before the pass starts
    #[must_use]
    pub fn with_machine_count(mut self, count: usize) -> Self {
        self.machine_count = count;
        self
    }

    /// Membership component, for read-only commands
    pub const fn watcher(&self) -> &MembershipWatcher {
        &self.watcher
    }

    /// Unit renderer, for `render`
    pub const fn renderer(&self) -> &UnitRenderer {
        &self.renderer
    }

    /// Deployment ledger, for `status`
    pub const fn tracker(&self) -> &DeploymentTracker {
        &self.tracker
    }

    /// Scheduler access, for `status`
    pub const fn poller(&self) -> &ConvergencePoller {
        &self.poller
    }

    /// Run one full bootstrap pass
    #[instrument(skip(self))]
    pub async fn run(&self) -> DomainResult<RunReport> {
        let started_at = Utc::now();

        let members = if self.machine_count > 0 {
            self.watcher.await_members(self.machine_count).await?
        } else {
            self.watcher.list_members().await?
        };
        info!(members = members.len(), "discovered fleet members");

        let mut machines = Vec::with_capacity(members.len());
        let mut records = Vec::with_capacity(members.len());
        let mut expected_units = Vec::new();
        let mut submitted = BTreeSet::new();
        for member in &members {
            let (record, report, units) = self.deploy_machine(&member.id).await?;
            if report.outcome == MachineOutcome::Deployed {
                submitted.extend(units.iter().map(|u| u.name.clone()));
            }
            machines.push(report);
            records.push(record);
            expected_units.extend(units);
        }

        let control_plane_addresses = addresses_for_role(&records, Role::ControlPlane);
        let worker_addresses = addresses_for_role(&records, Role::Worker);
        info!(
            control_plane = ?control_plane_addresses,
            workers = ?worker_addresses,
            "cluster addresses"
        );

        let convergence = self.converge(&expected_units, &submitted).await?;

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            machines,
            control_plane_addresses,
            worker_addresses,
            convergence,
        };
        info!(
            deployed = report.count(MachineOutcome::Deployed),
            already_deployed = report.count(MachineOutcome::AlreadyDeployed),
            skipped = report.count(MachineOutcome::Skipped),
            elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
            "bootstrap pass complete"
        );
        Ok(report)
    }

    /// Handle one machine; returns its record, its report and the units it must converge
    #[instrument(skip(self))]
    async fn deploy_machine(
        &self,
        machine_id: &str,
    ) -> DomainResult<(MachineRecord, MachineReport, Vec<UnitSpec>)> {
        let record = self.watcher.await_role(machine_id).await?;

        if !record.role.is_assigned() {
            warn!(
                role = record.role_label.as_deref().unwrap_or_default(),
                "machine role has no unit set, skipping"
            );
            let report = machine_report(&record, MachineOutcome::Skipped, &[]);
            return Ok((record, report, Vec::new()));
        }

        let units = self.renderer.render(&record);
        let outcome = if self.tracker.is_deployed(&record.id).await? {
            info!(role = %record.role, "machine already deployed");
            MachineOutcome::AlreadyDeployed
        } else {
            self.poller.submit(&units).await?;
            self.tracker.mark_deployed(&record.id).await?;
            info!(role = %record.role, units = units.len(), "machine deployed");
            MachineOutcome::Deployed
        };

        let report = machine_report(&record, outcome, &units);
        Ok((record, report, units))
    }

    /// Poll the download group, then the role group, each to its own target
    async fn converge(
        &self,
        units: &[UnitSpec],
        submitted: &BTreeSet<String>,
    ) -> DomainResult<Vec<GroupReport>> {
        let mut reports = Vec::new();

        for (group, target) in ConvergenceTarget::for_units(units, submitted) {
            let report = self.poller.poll_until_converged(&target).await?;
            reports.push(GroupReport {
                group,
                polls: report.polls,
                converged: report.converged,
                expected: report.expected,
            });
        }

        Ok(reports)
    }
}

fn machine_report(
    record: &MachineRecord,
    outcome: MachineOutcome,
    units: &[UnitSpec],
) -> MachineReport {
    MachineReport {
        machine_id: record.id.clone(),
        public_address: record.public_address.clone(),
        role: record.role,
        outcome,
        units: units.iter().map(|u| u.name.clone()).collect(),
    }
}
