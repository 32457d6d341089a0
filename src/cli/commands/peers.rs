//! `peers`: store cluster membership and this host's peer state.

use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Duration;

use crate::cli::context::AppContext;
use crate::cli::display::{list_table, render_list};
use crate::cli::output::{output, CommandOutput};
use crate::cli::types::PeersArgs;
use crate::infrastructure::etcd::{local_state, EtcdPeers, PeerMachine};

const HOSTNAME_VARS: [&str; 2] = ["HOSTNAME", "DOCKERHOST_HOSTNAME"];

/// Store cluster peers and this host's state among them
#[derive(Debug, Serialize)]
pub struct PeersOutput {
    /// Every peer the admin API lists
    pub peers: Vec<PeerMachine>,
    /// Host name used for the match
    pub hostname: Option<String>,
    /// State of the peer matching `hostname`
    pub local_state: Option<String>,
}

impl CommandOutput for PeersOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["name", "state", "client url", "peer url"]);
        for peer in &self.peers {
            table.add_row(vec![
                peer.name.clone(),
                peer.state.clone(),
                peer.client_url.clone(),
                peer.peer_url.clone(),
            ]);
        }

        let local = match (&self.hostname, &self.local_state) {
            (Some(host), Some(state)) => format!("Local host {host}: {state}"),
            (Some(host), None) => format!("Local host {host}: not a peer"),
            (None, _) => "Local host: unknown (set --hostname or HOSTNAME)".to_string(),
        };
        format!("{}\n{local}", render_list("peer", &table, self.peers.len()))
    }
}

/// Explicit hostname, else the first non-empty hostname variable
fn resolve_hostname(explicit: Option<String>) -> Option<String> {
    explicit.or_else(|| {
        HOSTNAME_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.trim().is_empty())
    })
}

/// List peers and resolve the local peer state
pub async fn execute(args: PeersArgs, ctx: &AppContext, json: bool) -> Result<()> {
    let client = EtcdPeers::new(
        &ctx.config.peers,
        Duration::from_secs(ctx.config.store.timeout_secs),
    )?;
    let peers = ctx
        .policies
        .transient
        .execute(|| client.list_peers())
        .await
        .context("Failed to list store peers")?;

    let hostname = resolve_hostname(args.hostname);
    let local_state = hostname
        .as_deref()
        .and_then(|host| local_state(&peers, host))
        .map(ToString::to_string);

    output(
        &PeersOutput {
            peers,
            hostname,
            local_state,
        },
        json,
    );
    Ok(())
}
