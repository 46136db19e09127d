//! The migration engine: plan, persist, apply, verify, status.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use remodel_schema::{Extractor, ModelRegistry, Schema};
use tracing::{debug, info};

use crate::diff::SchemaDiffer;
use crate::driver::{Driver, SqlDialect};
use crate::error::{MigrateResult, MigrationError};
use crate::introspect::{IntrospectOptions, Introspector};
use crate::op::{MigrationOp, MigrationPlan, OpKind};
use crate::state::{Ledger, StateStore};

/// Configuration for the migration engine.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Directory holding the plan and ledger files.
    pub state_dir: PathBuf,
    /// Tables protected from dropping, on top of the built-in set.
    pub protected_tables: Vec<String>,
    /// Tables hidden from introspection entirely.
    pub exclude_tables: Vec<String>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("./migrations"),
            protected_tables: Vec::new(),
            exclude_tables: Vec::new(),
        }
    }
}

impl MigrationConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the state directory.
    pub fn state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }

    /// Protect a table from being dropped.
    pub fn protect(mut self, table: impl Into<String>) -> Self {
        self.protected_tables.push(table.into());
        self
    }

    /// Exclude a table from introspection.
    pub fn exclude(mut self, table: impl Into<String>) -> Self {
        self.exclude_tables.push(table.into());
        self
    }
}

/// Options for a single apply run.
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Re-apply a plan that is already marked applied.
    pub force: bool,
    /// Render and report without touching the database or the state files.
    pub dry_run: bool,
    /// Reconcile already-satisfied operations into the ledger before
    /// executing.
    pub verify: bool,
}

impl ApplyOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the force flag.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Set dry-run mode.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set verify-first mode.
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }
}

/// Result of an apply run.
#[derive(Debug)]
pub struct ApplyReport {
    /// Identifiers executed this run, in order.
    pub executed: Vec<String>,
    /// Identifiers recorded without execution because the live schema
    /// already satisfied them.
    pub reconciled: Vec<String>,
    /// Operations skipped because the ledger already recorded them.
    pub skipped: usize,
    /// SQL statements rendered for the executed operations.
    pub statements: Vec<String>,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// Total duration in milliseconds.
    pub duration_ms: i64,
}

impl ApplyReport {
    /// Whether anything was executed or reconciled.
    pub fn has_changes(&self) -> bool {
        !self.executed.is_empty() || !self.reconciled.is_empty()
    }

    /// Get a summary of the run.
    pub fn summary(&self) -> String {
        if self.dry_run {
            if self.executed.is_empty() {
                return "[DRY RUN] Nothing to apply".to_string();
            }
            return format!("[DRY RUN] Would execute {} operations", self.executed.len());
        }

        let mut parts = Vec::new();

        if !self.executed.is_empty() {
            parts.push(format!("{} executed", self.executed.len()));
        }

        if !self.reconciled.is_empty() {
            parts.push(format!("{} reconciled", self.reconciled.len()));
        }

        if self.skipped > 0 {
            parts.push(format!("{} skipped", self.skipped));
        }

        if parts.is_empty() {
            "Nothing to apply".to_string()
        } else {
            format!("{} in {}ms", parts.join(", "), self.duration_ms)
        }
    }
}

/// Result of checking a plan against the live schema.
#[derive(Debug, Default)]
pub struct VerifyReport {
    /// Identifiers the live schema already satisfies.
    pub satisfied: Vec<String>,
    /// Identifiers still outstanding.
    pub unsatisfied: Vec<String>,
}

impl VerifyReport {
    /// Whether every operation in the plan is satisfied.
    pub fn is_fully_satisfied(&self) -> bool {
        self.unsatisfied.is_empty()
    }

    /// Get a summary of the verification.
    pub fn summary(&self) -> String {
        format!(
            "{} of {} operations satisfied",
            self.satisfied.len(),
            self.satisfied.len() + self.unsatisfied.len()
        )
    }
}

/// Migration status information.
#[derive(Debug)]
pub struct MigrationStatus {
    /// When the persisted plan was generated.
    pub plan_generated_at: Option<DateTime<Utc>>,
    /// When the persisted plan was fully applied.
    pub applied_at: Option<DateTime<Utc>>,
    /// Total operations in the persisted plan.
    pub total_operations: usize,
    /// Operations not yet recorded in the ledger.
    pub pending_operations: usize,
    /// Pending operations flagged destructive.
    pub destructive_pending: usize,
    /// Identifiers recorded in the ledger.
    pub ledger_entries: usize,
    /// When the most recent operation was executed.
    pub last_executed_at: Option<DateTime<Utc>>,
    /// Warnings carried by the persisted plan.
    pub warnings: Vec<String>,
}

impl MigrationStatus {
    /// Compute status from persisted state. Works without a database
    /// connection, so callers that only report can skip connecting.
    pub fn from_state(plan: Option<&MigrationPlan>, ledger: &Ledger) -> Self {
        let (pending_operations, destructive_pending) = match plan {
            Some(plan) => {
                let pending = ledger.pending(&plan.operations);
                let destructive = pending.iter().filter(|op| op.destructive).count();
                (pending.len(), destructive)
            }
            None => (0, 0),
        };

        Self {
            plan_generated_at: plan.map(|p| p.generated_at),
            applied_at: plan.and_then(|p| p.applied_at),
            total_operations: plan.map(|p| p.len()).unwrap_or(0),
            pending_operations,
            destructive_pending,
            ledger_entries: ledger.len(),
            last_executed_at: ledger.last_executed_at,
            warnings: plan.map(|p| p.warnings.clone()).unwrap_or_default(),
        }
    }

    /// Get a summary of the status.
    pub fn summary(&self) -> String {
        if self.plan_generated_at.is_none() {
            return "No migration plan; run generate first".to_string();
        }

        let mut parts = vec![format!("{} operations planned", self.total_operations)];

        if self.pending_operations > 0 {
            let mut pending = format!("{} pending", self.pending_operations);
            if self.destructive_pending > 0 {
                pending.push_str(&format!(" ({} destructive)", self.destructive_pending));
            }
            parts.push(pending);
        } else {
            parts.push("up to date".to_string());
        }

        parts.join(", ")
    }
}

/// The main migration engine.
///
/// Owns a dialect driver and a state store, and orchestrates the planning
/// pipeline end to end: extract the desired schema from registered models,
/// introspect the live database, diff the two into a plan, and apply the
/// plan operation by operation with the ledger recording each step.
pub struct MigrationEngine {
    config: MigrationConfig,
    driver: Box<dyn Driver>,
    store: StateStore,
}

impl MigrationEngine {
    /// Create a new migration engine.
    pub fn new(config: MigrationConfig, driver: Box<dyn Driver>) -> Self {
        let store = StateStore::new(&config.state_dir);
        Self {
            config,
            driver,
            store,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Get the underlying driver.
    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    /// Get the state store.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    fn differ(&self) -> SchemaDiffer {
        let mut differ = SchemaDiffer::new();
        for table in &self.config.protected_tables {
            differ = differ.protect(table.clone());
        }
        differ
    }

    fn introspect_options(&self) -> IntrospectOptions {
        let mut options = IntrospectOptions::new();
        for table in &self.config.exclude_tables {
            options = options.exclude(table.clone());
        }
        options
    }

    async fn live_schema(&self) -> MigrateResult<Schema> {
        Introspector::with_options(self.driver.as_ref(), self.introspect_options())
            .snapshot()
            .await
    }

    /// Compute a migration plan for the registered models against the live
    /// database. Extraction warnings surface ahead of diff warnings on the
    /// returned plan.
    pub async fn plan(&self, registry: &ModelRegistry) -> MigrateResult<MigrationPlan> {
        let extraction = Extractor::new(self.driver.as_ref()).extract(registry);
        let current = self.live_schema().await?;

        let mut plan = self.differ().diff(&extraction.schema, &current);
        let mut warnings: Vec<String> =
            extraction.warnings.iter().map(|w| w.to_string()).collect();
        warnings.append(&mut plan.warnings);
        plan.warnings = warnings;

        info!(
            operations = plan.len(),
            destructive = plan.destructive_count(),
            warnings = plan.warnings.len(),
            "Planned migration"
        );
        Ok(plan)
    }

    /// Persist a plan to the state directory.
    pub async fn persist(&self, plan: &MigrationPlan) -> MigrateResult<()> {
        self.store.save_plan(plan).await
    }

    /// Load the persisted plan.
    pub async fn load_plan(&self) -> MigrateResult<MigrationPlan> {
        self.store.load_plan().await?.ok_or(MigrationError::NoPlan)
    }

    /// Apply a plan operation by operation.
    ///
    /// Each operation is rendered through the driver's dialect, executed,
    /// and recorded in the ledger before the next one starts, so an
    /// interrupted run resumes where it stopped. A failed operation aborts
    /// the run without a ledger entry for it. The plan is marked applied
    /// only once every operation is recorded.
    pub async fn apply(
        &self,
        plan: &MigrationPlan,
        options: &ApplyOptions,
    ) -> MigrateResult<ApplyReport> {
        if let Some(applied_at) = plan.applied_at
            && !options.force
        {
            return Err(MigrationError::AlreadyApplied {
                applied_at: applied_at.to_rfc3339(),
            });
        }

        let start = Instant::now();
        let mut ledger = self.store.load_ledger().await?;
        let mut report = ApplyReport {
            executed: Vec::new(),
            reconciled: Vec::new(),
            skipped: 0,
            statements: Vec::new(),
            dry_run: options.dry_run,
            duration_ms: 0,
        };

        if options.verify {
            let verified = self.verify(plan).await?;
            for identifier in &verified.satisfied {
                if ledger.record(identifier.clone()) {
                    report.reconciled.push(identifier.clone());
                }
            }
            if !report.reconciled.is_empty() {
                info!(
                    count = report.reconciled.len(),
                    "Reconciled already-satisfied operations into the ledger"
                );
                if !options.dry_run {
                    self.store.save_ledger(&ledger).await?;
                }
            }
        }

        let pending: Vec<MigrationOp> = ledger
            .pending(&plan.operations)
            .into_iter()
            .cloned()
            .collect();
        report.skipped = plan.len() - pending.len() - report.reconciled.len();

        for op in &pending {
            let statements = self.driver.render(op);

            if options.dry_run {
                report.statements.extend(statements);
                report.executed.push(op.identifier());
                continue;
            }

            debug!(op = %op, statements = statements.len(), "Executing operation");
            for statement in &statements {
                if let Err(e) = self.driver.execute(statement).await {
                    return Err(MigrationError::operation_failed(
                        op.identifier(),
                        e.to_string(),
                    ));
                }
            }

            ledger.record(op.identifier());
            self.store.save_ledger(&ledger).await?;
            report.statements.extend(statements);
            report.executed.push(op.identifier());
        }

        if !options.dry_run && plan.applied_at.is_none() {
            let mut completed = plan.clone();
            completed.mark_applied();
            self.store.save_plan(&completed).await?;
        }

        report.duration_ms = start.elapsed().as_millis() as i64;
        info!(summary = %report.summary(), "Apply finished");
        Ok(report)
    }

    /// Check which plan operations the live schema already satisfies.
    pub async fn verify(&self, plan: &MigrationPlan) -> MigrateResult<VerifyReport> {
        let live = self.live_schema().await?;

        let mut report = VerifyReport::default();
        for op in &plan.operations {
            if op_satisfied(op, &live) {
                report.satisfied.push(op.identifier());
            } else {
                report.unsatisfied.push(op.identifier());
            }
        }
        Ok(report)
    }

    /// Get migration status from the persisted state.
    pub async fn status(&self) -> MigrateResult<MigrationStatus> {
        let plan = self.store.load_plan().await?;
        let ledger = self.store.load_ledger().await?;
        Ok(MigrationStatus::from_state(plan.as_ref(), &ledger))
    }
}

/// Whether the live schema already satisfies an operation.
fn op_satisfied(op: &MigrationOp, live: &Schema) -> bool {
    let table = live.get_table(&op.table);
    match &op.kind {
        OpKind::CreateTable { .. } => table.is_some(),
        OpKind::DropTable => table.is_none(),
        OpKind::AddColumn { column } => {
            table.is_some_and(|t| t.get_column(&column.name).is_some())
        }
        OpKind::ModifyColumn { to, .. } => table.is_some_and(|t| {
            t.get_column(&to.name)
                .is_some_and(|live| !to.definition_differs(live))
        }),
        OpKind::DropColumn { column } => table.is_none_or(|t| t.get_column(column).is_none()),
        OpKind::AddIndex { index } => table.is_some_and(|t| {
            t.indexes
                .values()
                .any(|live| live.name == index.name || live.matches(index))
        }),
        OpKind::DropIndex { index } => table.is_none_or(|t| !t.indexes.contains_key(index)),
        OpKind::AddForeignKey { foreign_key } => table.is_some_and(|t| {
            t.foreign_keys
                .values()
                .any(|live| live.name == foreign_key.name || live.matches(foreign_key))
        }),
        OpKind::DropForeignKey { foreign_key } => {
            table.is_none_or(|t| !t.foreign_keys.contains_key(foreign_key))
        }
    }
}
