//! `remodel status` command - Show plan and ledger state.

use remodel_migrate::{MigrationStatus, StateStore};

use crate::cli::StatusArgs;
use crate::commands::load_config;
use crate::error::CliResult;
use crate::output::{self, warn};

/// Run the status command
pub async fn run(args: StatusArgs) -> CliResult<()> {
    output::header("Migration Status");

    let config = load_config(args.config.as_ref())?;

    // Status reads the state files only; no database connection needed.
    let store = StateStore::new(config.state.dir.clone());
    let plan = store.load_plan().await?;
    let ledger = store.load_ledger().await?;
    let status = MigrationStatus::from_state(plan.as_ref(), &ledger);

    output::kv("State", &store.dir().display().to_string());

    match status.plan_generated_at {
        Some(generated_at) => output::kv("Plan generated", &generated_at.to_rfc3339()),
        None => output::kv("Plan generated", "never"),
    }
    match status.applied_at {
        Some(applied_at) => {
            output::kv("Applied", &output::style_success(&applied_at.to_rfc3339()))
        }
        None => output::kv("Applied", "not yet"),
    }
    output::kv("Operations", &status.total_operations.to_string());

    if status.pending_operations > 0 {
        let mut pending = status.pending_operations.to_string();
        if status.destructive_pending > 0 {
            pending.push_str(&format!(" ({} destructive)", status.destructive_pending));
        }
        output::kv("Pending", &output::style_pending(&pending));
    } else {
        output::kv("Pending", "0");
    }

    output::kv("Ledger entries", &status.ledger_entries.to_string());
    if let Some(last_executed_at) = status.last_executed_at {
        output::kv("Last executed", &last_executed_at.to_rfc3339());
    }
    output::newline();

    for warning in &status.warnings {
        warn(warning);
    }
    if !status.warnings.is_empty() {
        output::newline();
    }

    output::info(&status.summary());

    Ok(())
}
