//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Remodel CLI - declarative schema migrations
#[derive(Parser, Debug)]
#[command(name = "remodel")]
#[command(author = "Pegasus Heavy Industries LLC")]
#[command(version)]
#[command(about = "Remodel CLI - declarative schema migrations", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a new Remodel project
    Init(InitArgs),

    /// Diff models against the database and write a migration plan
    Generate(GenerateArgs),

    /// Apply the persisted migration plan
    Apply(ApplyArgs),

    /// Show plan and ledger state
    Status(StatusArgs),

    /// Display version information
    Version,
}

// =============================================================================
// Init Command
// =============================================================================

/// Arguments for the `init` command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path to initialize the project (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Database dialect to use
    #[arg(short, long, default_value = "mysql")]
    pub dialect: DatabaseDialect,

    /// Database connection URL
    #[arg(short, long)]
    pub url: Option<String>,

    /// Skip generating an example model descriptor
    #[arg(long)]
    pub no_example: bool,

    /// Accept all defaults without prompting
    #[arg(short, long)]
    pub yes: bool,
}

/// Supported database dialects
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum DatabaseDialect {
    #[default]
    Mysql,
    Postgres,
}

impl std::fmt::Display for DatabaseDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseDialect::Mysql => write!(f, "mysql"),
            DatabaseDialect::Postgres => write!(f, "postgres"),
        }
    }
}

// =============================================================================
// Generate Command
// =============================================================================

/// Arguments for the `generate` command
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Path to the config file (defaults to ./remodel.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the rendered SQL script for the plan
    #[arg(long)]
    pub print_sql: bool,
}

// =============================================================================
// Apply Command
// =============================================================================

/// Arguments for the `apply` command
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Path to the config file (defaults to ./remodel.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Re-apply a plan that is already marked applied
    #[arg(short, long)]
    pub force: bool,

    /// Render and report without executing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Reconcile already-satisfied operations into the ledger first
    #[arg(long)]
    pub verify: bool,

    /// Skip the destructive-operation confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

// =============================================================================
// Status Command
// =============================================================================

/// Arguments for the `status` command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Path to the config file (defaults to ./remodel.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
