//! `render`: write each member's units to disk without submitting them.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::context::AppContext;
use crate::cli::output::{output, CommandOutput};
use crate::cli::types::RenderArgs;
use crate::infrastructure::templates::write_units;

/// Files written by `render`
#[derive(Debug, Serialize)]
pub struct RenderOutput {
    /// Root output directory
    pub output_dir: String,
    /// Machines rendered
    pub machines: Vec<String>,
    /// Machines without a unit set
    pub skipped: Vec<String>,
    /// Written paths
    pub files: Vec<String>,
}

impl CommandOutput for RenderOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Rendered {} unit(s) for {} machine(s) into {}",
            self.files.len(),
            self.machines.len(),
            self.output_dir
        )];
        lines.extend(self.files.iter().map(|f| format!("  {f}")));
        if !self.skipped.is_empty() {
            lines.push(format!("Skipped (no role): {}", self.skipped.join(", ")));
        }
        lines.join("\n")
    }
}

/// Render units to disk without submitting them
pub async fn execute(args: RenderArgs, ctx: &AppContext, json: bool) -> Result<()> {
    let orchestrator = ctx.orchestrator()?;
    let mut members = orchestrator
        .watcher()
        .list_members()
        .await
        .context("Failed to list fleet members")?;

    if let Some(ref machine) = args.machine {
        members.retain(|m| &m.id == machine);
        if members.is_empty() {
            anyhow::bail!("Machine {machine} is not registered");
        }
    }

    let mut result = RenderOutput {
        output_dir: args.output.display().to_string(),
        machines: Vec::new(),
        skipped: Vec::new(),
        files: Vec::new(),
    };

    for member in &members {
        if !member.role.is_assigned() {
            result.skipped.push(member.id.clone());
            continue;
        }

        let units = orchestrator.renderer().render(member);
        let written = write_units(&args.output, &units)?;
        info!(machine_id = %member.id, units = written.len(), "rendered units to disk");
        result.machines.push(member.id.clone());
        result
            .files
            .extend(written.iter().map(|p| p.display().to_string()));
    }

    output(&result, json);
    Ok(())
}
