//! `remodel generate` command - Diff models against the database and
//! write a migration plan.

use remodel_migrate::SqlGenerator;
use remodel_schema::ModelRegistry;

use crate::cli::GenerateArgs;
use crate::commands::{connect_engine, load_config};
use crate::error::CliResult;
use crate::output::{self, success, warn};

/// Run the generate command
pub async fn run(args: GenerateArgs) -> CliResult<()> {
    output::header("Generate Migration Plan");

    let config = load_config(args.config.as_ref())?;

    output::kv("Dialect", &config.database.dialect);
    output::kv("Models", &config.models.dir.display().to_string());
    output::kv("State", &config.state.dir.display().to_string());
    output::newline();

    // 1. Load model descriptors
    output::step(1, 4, "Loading model descriptors...");
    let registry = ModelRegistry::load_dir(&config.models.dir)?;
    if registry.is_empty() {
        warn(&format!(
            "No model descriptors found in {}",
            config.models.dir.display()
        ));
    }

    // 2. Connect
    output::step(2, 4, "Connecting to the database...");
    let engine = connect_engine(&config).await?;

    // 3. Diff
    output::step(3, 4, "Comparing models to the live schema...");
    let plan = engine.plan(&registry).await?;

    // 4. Persist
    output::step(4, 4, "Writing plan...");
    engine.persist(&plan).await?;

    output::newline();

    for warning in &plan.warnings {
        warn(warning);
    }
    if !plan.warnings.is_empty() {
        output::newline();
    }

    if plan.is_empty() {
        success("No schema changes detected");
    } else {
        success(&format!(
            "Plan written to {}",
            engine.store().plan_path().display()
        ));
        output::info(&plan.summary());
        output::newline();

        output::section("Planned operations");
        for op in &plan.operations {
            if op.destructive {
                output::list_item(&output::style_destructive(&format!(
                    "{} (destructive)",
                    op.identifier()
                )));
            } else {
                output::list_item(&op.identifier());
            }
        }
    }

    if args.print_sql && !plan.is_empty() {
        output::newline();
        output::section("SQL script");
        let script = SqlGenerator::new(engine.driver()).script(&plan.operations);
        output::sql(&script);
    }

    Ok(())
}
