//! fleetboot CLI entry point.

use clap::Parser;

use fleetboot::cli::commands::{deploy, members, peers, render, status};
use fleetboot::cli::{handle_error, load_config, AppContext, Cli, Commands};
use fleetboot::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => handle_error(&err, cli.json),
    };

    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => logger,
        Err(err) => handle_error(&err, cli.json),
    };

    let ctx = match AppContext::new(config) {
        Ok(ctx) => ctx,
        Err(err) => handle_error(&err, cli.json),
    };

    let result = match cli.command {
        Commands::Deploy(args) => deploy::execute(args, &ctx, cli.json).await,
        Commands::Members => members::execute(&ctx, cli.json).await,
        Commands::Render(args) => render::execute(args, &ctx, cli.json).await,
        Commands::Status => status::execute(&ctx, cli.json).await,
        Commands::Peers(args) => peers::execute(args, &ctx, cli.json).await,
    };

    if let Err(err) = result {
        handle_error(&err, cli.json);
    }
}
