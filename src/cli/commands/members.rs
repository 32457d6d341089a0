//! `members`: list registered machines without waiting on them.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::context::AppContext;
use crate::cli::display::{list_table, render_list};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{MachineRecord, Role};

/// One row of the member listing
#[derive(Debug, Serialize)]
pub struct MemberOutput {
    /// Machine ID
    pub id: String,
    /// Published address
    pub public_address: String,
    /// Resolved role
    pub role: Role,
    /// Role value as published, if any
    pub role_label: Option<String>,
}

impl From<&MachineRecord> for MemberOutput {
    fn from(record: &MachineRecord) -> Self {
        Self {
            id: record.id.clone(),
            public_address: record.public_address.clone(),
            role: record.role,
            role_label: record.role_label.clone(),
        }
    }
}

/// Member listing
#[derive(Debug, Serialize)]
pub struct MembersOutput {
    /// Members sorted by ID
    pub members: Vec<MemberOutput>,
    /// Number of members
    pub total: usize,
}

impl CommandOutput for MembersOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "address", "role", "published"]);
        for member in &self.members {
            table.add_row(vec![
                member.id.clone(),
                member.public_address.clone(),
                member.role.to_string(),
                member.role_label.clone().unwrap_or_else(|| "-".to_string()),
            ]);
        }
        render_list("machine", &table, self.total)
    }
}

/// List members without waiting on roles
pub async fn execute(ctx: &AppContext, json: bool) -> Result<()> {
    let orchestrator = ctx.orchestrator()?;
    let members = orchestrator
        .watcher()
        .list_members()
        .await
        .context("Failed to list fleet members")?;

    let members: Vec<MemberOutput> = members.iter().map(MemberOutput::from).collect();
    let total = members.len();
    output(&MembersOutput { members, total }, json);
    Ok(())
}
