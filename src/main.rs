//! cdnctl - Azure CDN / Front Door delivery rule management
//!
//! JSON Lines output in agent mode, pretty JSON otherwise

mod arm;
mod cli;
mod commands;
mod config;
mod error;
mod output;
mod rules;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use output::{ErrorEvent, Output};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "cdnctl=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn op_name(command: &Commands) -> &'static str {
    match command {
        Commands::EndpointRule(_) => "endpoint-rule",
        Commands::AfdRuleSet(_) => "afd-rule-set",
        Commands::AfdRule(_) => "afd-rule",
        Commands::AfdOriginGroup(_) => "afd-origin-group",
        Commands::AfdOrigin(_) => "afd-origin",
        Commands::AfdRoute(_) => "afd-route",
        Commands::OriginGroup(_) => "origin-group",
    }
}

async fn dispatch(command: Commands, subscription: Option<String>, no_wait: bool, out: &Output) -> Result<()> {
    config::load_env()?;
    let subscription_id = config::subscription_id(subscription)?;
    let store = config::open_store(no_wait)?;
    let ctx = commands::Context::new(store.as_ref(), subscription_id);

    match command {
        Commands::EndpointRule(cmd) => commands::endpoint_rule::run(cmd, &ctx, out).await,
        Commands::AfdRuleSet(cmd) => commands::afd_rule_set::run(cmd, &ctx, out).await,
        Commands::AfdRule(cmd) => commands::afd_rule::run(cmd, &ctx, out).await,
        Commands::AfdOriginGroup(cmd) => commands::afd_origin_group::run(cmd, &ctx, out).await,
        Commands::AfdOrigin(cmd) => commands::afd_origin::run(cmd, &ctx, out).await,
        Commands::AfdRoute(cmd) => commands::afd_route::run(cmd, &ctx, out).await,
        Commands::OriginGroup(cmd) => commands::origin_group::run(cmd, &ctx, out).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Handle --manifest before anything else
    if cli.manifest {
        output::print_manifest();
        return;
    }

    init_tracing(cli.verbose);
    let out = Output::new(cli.agent);

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            eprintln!("Error: no command provided. Use --help for usage.");
            std::process::exit(1);
        }
    };

    let op = op_name(&command);
    if let Err(e) = dispatch(command, cli.subscription, cli.no_wait, &out).await {
        tracing::debug!(error = ?e, "command failed");
        out.error(ErrorEvent::from_error(&e).with_op(op));
    }
}
