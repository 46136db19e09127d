//! Remodel CLI - Command-line interface for Remodel schema migrations.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use remodel_cli::cli::{Cli, Command};
use remodel_cli::commands;
use remodel_cli::error::CliResult;
use remodel_cli::output;

#[tokio::main]
async fn main() {
    // Engine logs stay on stderr and stay quiet unless REMODEL_LOG asks
    // for more
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("REMODEL_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Run the CLI and handle errors
    if let Err(e) = run().await {
        output::newline();
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Run the appropriate command
    match cli.command {
        Command::Init(args) => commands::init::run(args).await,
        Command::Generate(args) => commands::generate::run(args).await,
        Command::Apply(args) => commands::apply::run(args).await,
        Command::Status(args) => commands::status::run(args).await,
        Command::Version => commands::version::run().await,
    }
}
