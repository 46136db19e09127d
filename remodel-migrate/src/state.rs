//! Persistent migration state: the plan file and the execution ledger.
//!
//! Both artifacts are JSON files under one state directory. Reads are
//! lenient: a missing or unreadable file behaves as empty state with a
//! logged warning, so damaged state never blocks a run (the engine's
//! verify step reconciles a lost ledger against the live schema). Writes
//! go through a temp file and rename, so a crash never leaves a
//! half-written file behind.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{MigrateResult, MigrationError};
use crate::op::{MigrationOp, MigrationPlan};

/// File name of the persisted plan.
pub const PLAN_FILE: &str = "plan.json";
/// File name of the execution ledger.
pub const LEDGER_FILE: &str = "ledger.json";

/// The append-only record of executed operation identifiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    /// Executed identifiers, in execution order.
    #[serde(default)]
    pub executed: Vec<String>,
    /// When the most recent operation was recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_executed_at: Option<DateTime<Utc>>,
}

impl Ledger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an executed identifier. Returns `false` if it was already
    /// present; recording is idempotent.
    pub fn record(&mut self, identifier: impl Into<String>) -> bool {
        let identifier = identifier.into();
        if self.contains(&identifier) {
            return false;
        }
        self.executed.push(identifier);
        self.last_executed_at = Some(Utc::now());
        true
    }

    /// Whether an identifier has been recorded.
    pub fn contains(&self, identifier: &str) -> bool {
        self.executed.iter().any(|id| id == identifier)
    }

    /// The operations not yet recorded, in plan order.
    pub fn pending<'a>(&self, operations: &'a [MigrationOp]) -> Vec<&'a MigrationOp> {
        operations
            .iter()
            .filter(|op| !self.contains(&op.identifier()))
            .collect()
    }

    /// Number of recorded identifiers.
    pub fn len(&self) -> usize {
        self.executed.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.executed.is_empty()
    }
}

/// Reads and writes the plan and ledger files.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    /// Create a store rooted at the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The state directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the plan file.
    pub fn plan_path(&self) -> PathBuf {
        self.dir.join(PLAN_FILE)
    }

    /// Path of the ledger file.
    pub fn ledger_path(&self) -> PathBuf {
        self.dir.join(LEDGER_FILE)
    }

    /// Load the persisted plan. `None` when no plan has been generated or
    /// the file is unreadable.
    pub async fn load_plan(&self) -> MigrateResult<Option<MigrationPlan>> {
        self.read_json(&self.plan_path()).await
    }

    /// Load the ledger; missing or unreadable files yield an empty ledger.
    pub async fn load_ledger(&self) -> MigrateResult<Ledger> {
        Ok(self
            .read_json(&self.ledger_path())
            .await?
            .unwrap_or_default())
    }

    /// Persist the plan.
    pub async fn save_plan(&self, plan: &MigrationPlan) -> MigrateResult<()> {
        self.write_json(&self.plan_path(), plan).await
    }

    /// Persist the ledger.
    pub async fn save_ledger(&self, ledger: &Ledger) -> MigrateResult<()> {
        self.write_json(&self.ledger_path(), ledger).await
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> MigrateResult<Option<T>> {
        let text = match fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&text) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Unreadable state file; treating as empty"
                );
                Ok(None)
            }
        }
    }

    async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> MigrateResult<()> {
        fs::create_dir_all(&self.dir).await?;
        let json =
            serde_json::to_string_pretty(value).map_err(|e| MigrationError::state(e.to_string()))?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, format!("{json}\n")).await?;
        fs::rename(&tmp, path).await?;
        debug!(path = %path.display(), "Wrote state file");
        Ok(())
    }
}
