//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fleetboot")]
#[command(about = "Bootstrap fleet machines into control-plane and worker cluster members", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to .fleetboot/config.yaml and .fleetboot/local.yaml)
    #[arg(short, long, global = true, env = "FLEETBOOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a full bootstrap pass: discover, render, submit, record, converge
    Deploy(DeployArgs),

    /// List registered machines and their roles
    Members,

    /// Render units for every member with a role into a directory, without submitting
    Render(RenderArgs),

    /// Show the deployment record and the scheduler's unit states
    Status,

    /// List store cluster peers and this host's peer state
    Peers(PeersArgs),
}

#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Wait until at least this many machines have registered
    #[arg(short, long)]
    pub machine_count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Output directory; units land in download/ and role/ subdirectories
    #[arg(short, long)]
    pub output: PathBuf,

    /// Render only this machine
    #[arg(short, long)]
    pub machine: Option<String>,
}

#[derive(Args, Debug)]
pub struct PeersArgs {
    /// Host name to match against peer names (defaults to $HOSTNAME)
    #[arg(long)]
    pub hostname: Option<String>,
}
