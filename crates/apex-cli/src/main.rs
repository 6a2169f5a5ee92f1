//! apexres - APEX content resolution CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use apex_cli::cmd;
use apex_cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let quiet = cli.quiet;

    match cli.command {
        Commands::Resolve {
            graph,
            container,
            format,
        } => cmd::resolve::resolve(&graph, &container, format, quiet),
        Commands::Fanout {
            graph,
            container,
            format,
        } => cmd::fanout::fanout(&graph, &container, format, quiet),
        Commands::Check { graph, container } => cmd::check::check(&graph, &container, quiet),
    }
}
