//! `remodel apply` command - Execute the persisted migration plan.

use remodel_migrate::ApplyOptions;

use crate::cli::ApplyArgs;
use crate::commands::{connect_engine, load_config};
use crate::error::CliResult;
use crate::output::{self, success, warn};

/// Run the apply command
pub async fn run(args: ApplyArgs) -> CliResult<()> {
    output::header("Apply Migration Plan");

    let config = load_config(args.config.as_ref())?;

    output::kv("Dialect", &config.database.dialect);
    output::kv("State", &config.state.dir.display().to_string());
    output::newline();

    // 1. Connect
    output::step(1, 3, "Connecting to the database...");
    let engine = connect_engine(&config).await?;

    // 2. Load the plan
    output::step(2, 3, "Loading plan...");
    let plan = engine.load_plan().await?;
    output::list_item(&plan.summary());

    // Pending destructive operations need an explicit go-ahead
    let ledger = engine.store().load_ledger().await?;
    let destructive: Vec<String> = ledger
        .pending(&plan.operations)
        .into_iter()
        .filter(|op| op.destructive)
        .map(|op| op.identifier())
        .collect();

    if !destructive.is_empty()
        && !args.dry_run
        && !args.yes
        && !config.migration.allow_destructive
    {
        output::newline();
        warn(&format!(
            "{} destructive operations pending:",
            destructive.len()
        ));
        for identifier in &destructive {
            output::list_item(&output::style_destructive(identifier));
        }
        output::newline();

        if !output::confirm("Apply destructive operations?") {
            warn("Aborted");
            return Ok(());
        }
    }

    // 3. Apply
    if args.dry_run {
        output::step(3, 3, "Rendering plan (dry run)...");
    } else {
        output::step(3, 3, "Applying plan...");
    }

    let options = ApplyOptions::new()
        .force(args.force)
        .dry_run(args.dry_run)
        .verify(args.verify);
    let report = engine.apply(&plan, &options).await?;

    if report.dry_run && !report.statements.is_empty() {
        output::newline();
        output::section("Statements");
        let script: String = report
            .statements
            .iter()
            .map(|statement| format!("{};\n", statement))
            .collect();
        output::sql(&script);
    }

    for identifier in &report.reconciled {
        output::list_item(&format!("{} already satisfied, reconciled", identifier));
    }
    if !report.dry_run {
        for identifier in &report.executed {
            output::list_item(&output::style_success(identifier));
        }
    }

    output::newline();
    success(&report.summary());

    Ok(())
}
