//! `status`: deployment record plus scheduler unit states.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::context::AppContext;
use crate::cli::display::{list_table, render_list};
use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::UnitState;

/// Deployment record and scheduler view
#[derive(Debug, Serialize)]
pub struct StatusOutput {
    /// Deployed machine IDs, in record order
    pub deployed: Vec<String>,
    /// Scheduler-reported unit states
    pub units: Vec<UnitState>,
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        let deployed = if self.deployed.is_empty() {
            "Deployed machines: none".to_string()
        } else {
            format!("Deployed machines: {}", self.deployed.join(", "))
        };

        let mut table = list_table(&["unit", "machine", "load", "active", "sub"]);
        for unit in &self.units {
            table.add_row(vec![
                unit.unit_name.clone(),
                truncate(&unit.machine_id, 12),
                unit.load_state.clone().unwrap_or_else(|| "-".to_string()),
                unit.active_state.to_string(),
                unit.sub_state.to_string(),
            ]);
        }

        format!("{deployed}\n{}", render_list("unit", &table, self.units.len()))
    }
}

/// Show the record and current unit states
pub async fn execute(ctx: &AppContext, json: bool) -> Result<()> {
    let orchestrator = ctx.orchestrator()?;
    let deployed = orchestrator
        .tracker()
        .deployed_ids()
        .await
        .context("Failed to read deployment record")?;
    let mut units = orchestrator
        .poller()
        .unit_states()
        .await
        .context("Failed to query unit states")?;
    units.sort_by(|a, b| a.unit_name.cmp(&b.unit_name));

    output(&StatusOutput { deployed, units }, json);
    Ok(())
}
