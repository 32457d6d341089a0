//! `deploy`: one full bootstrap pass.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::context::AppContext;
use crate::cli::display::{list_table, render_list};
use crate::cli::output::{output, CommandOutput};
use crate::cli::types::DeployArgs;
use crate::services::{MachineOutcome, RunReport};

/// Run report of a finished pass
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct DeployOutput(pub RunReport);

impl CommandOutput for DeployOutput {
    fn to_human(&self) -> String {
        let report = &self.0;
        let mut table = list_table(&["machine", "address", "role", "outcome", "units"]);
        for machine in &report.machines {
            let outcome = match machine.outcome {
                MachineOutcome::Deployed => "deployed",
                MachineOutcome::AlreadyDeployed => "already deployed",
                MachineOutcome::Skipped => "skipped",
            };
            table.add_row(vec![
                machine.machine_id.clone(),
                machine.public_address.clone(),
                machine.role.to_string(),
                outcome.to_string(),
                machine.units.len().to_string(),
            ]);
        }

        let mut lines = vec![render_list("machine", &table, report.machines.len())];
        lines.push(format!(
            "Control plane: {}",
            address_list(&report.control_plane_addresses)
        ));
        lines.push(format!("Workers: {}", address_list(&report.worker_addresses)));
        for group in &report.convergence {
            lines.push(format!(
                "{} units converged: {}/{} after {} poll(s)",
                group.group, group.converged, group.expected, group.polls
            ));
        }
        lines.push(format!(
            "Finished in {}s",
            (report.finished_at - report.started_at).num_seconds()
        ));
        lines.join("\n")
    }
}

fn address_list(addresses: &[String]) -> String {
    if addresses.is_empty() {
        "-".to_string()
    } else {
        addresses.join(", ")
    }
}

/// Run one pass and print its report
pub async fn execute(args: DeployArgs, ctx: &AppContext, json: bool) -> Result<()> {
    let mut orchestrator = ctx.orchestrator()?;
    if let Some(count) = args.machine_count {
        orchestrator = orchestrator.with_machine_count(count);
    }

    let report = orchestrator.run().await.context("Bootstrap pass failed")?;
    output(&DeployOutput(report), json);
    Ok(())
}
