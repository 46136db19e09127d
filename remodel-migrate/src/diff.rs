//! Schema diffing: desired state vs live state, as an ordered plan.
//!
//! The differ is pure and deterministic. Table, column, index, and
//! foreign-key names are visited in sorted order, and the emitted plan obeys
//! a fixed phase order: creates, then per-table alterations, then drops.
//! Within an altered table, column operations come before index operations
//! before foreign-key operations, so no statement references an object the
//! plan has not yet produced.

use std::collections::{BTreeSet, HashSet};

use remodel_schema::{Schema, Table};
use tracing::debug;

use crate::compat;
use crate::op::{MigrationOp, MigrationPlan, OpKind};

/// Tables never dropped by a generated plan: the queue, migration-ledger,
/// cache, and session tables live outside the model layer.
pub const DEFAULT_PROTECTED_TABLES: [&str; 5] =
    ["jobs", "failed_jobs", "migrations", "cache", "sessions"];

/// Compares a desired schema against a live one and produces a plan.
#[derive(Debug, Clone)]
pub struct SchemaDiffer {
    protected: BTreeSet<String>,
}

impl Default for SchemaDiffer {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaDiffer {
    /// Create a differ with the default protected-table set.
    pub fn new() -> Self {
        Self {
            protected: DEFAULT_PROTECTED_TABLES
                .iter()
                .map(|name| (*name).to_string())
                .collect(),
        }
    }

    /// Protect an additional table from being dropped.
    pub fn protect(mut self, table: impl Into<String>) -> Self {
        self.protected.insert(table.into());
        self
    }

    /// Whether a table is protected from drops.
    pub fn is_protected(&self, table: &str) -> bool {
        self.protected.contains(table)
    }

    /// The protected table names, sorted.
    pub fn protected_tables(&self) -> Vec<&str> {
        self.protected.iter().map(String::as_str).collect()
    }

    /// Compute the migration plan turning `current` into `desired`.
    pub fn diff(&self, desired: &Schema, current: &Schema) -> MigrationPlan {
        let mut ops = Vec::new();
        let mut warnings = Vec::new();

        // Phase 1: new tables, with their indexes and constraints. All
        // createTable ops come first so that a constraint on one new table
        // can reference another.
        let new_tables: Vec<&Table> = desired
            .sorted_table_names()
            .into_iter()
            .filter(|name| !current.contains_table(name))
            .filter_map(|name| desired.get_table(name))
            .collect();
        for table in &new_tables {
            ops.push(MigrationOp::new(
                &table.name,
                OpKind::CreateTable {
                    definition: Self::column_definition(table),
                },
                false,
            ));
        }
        for table in &new_tables {
            Self::push_new_indexes(table, &mut ops);
        }
        for table in &new_tables {
            Self::push_new_foreign_keys(table, &mut ops);
        }

        // Phase 2: alterations on tables present in both schemas.
        for name in desired.sorted_table_names() {
            if let (Some(target), Some(live)) = (desired.get_table(name), current.get_table(name)) {
                Self::diff_table(live, target, &mut ops);
            }
        }

        // Phase 3: dropped tables, protected ones excepted.
        for name in current.sorted_table_names() {
            if desired.contains_table(name) {
                continue;
            }
            if self.is_protected(name) {
                debug!(table = %name, "Skipping drop of protected table");
                warnings.push(format!("table `{}` is protected and will not be dropped", name));
                continue;
            }
            ops.push(MigrationOp::new(name, OpKind::DropTable, true));
        }

        debug!(operations = ops.len(), "Computed schema diff");
        MigrationPlan::new(ops).with_warnings(warnings)
    }

    /// The create-op payload: columns only. Indexes and foreign keys arrive
    /// as separate ops, which the dialect renders into `CREATE INDEX` /
    /// `ADD CONSTRAINT` statements.
    fn column_definition(table: &Table) -> Table {
        let mut definition = Table::new(&table.name);
        for column in table.columns.values() {
            definition.add_column(column.clone());
        }
        definition
    }

    fn push_new_indexes(table: &Table, ops: &mut Vec<MigrationOp>) {
        for name in sorted_keys(table.indexes.keys()) {
            if let Some(index) = table.get_index(name) {
                ops.push(MigrationOp::new(
                    &table.name,
                    OpKind::AddIndex {
                        index: index.clone(),
                    },
                    false,
                ));
            }
        }
    }

    fn push_new_foreign_keys(table: &Table, ops: &mut Vec<MigrationOp>) {
        for name in sorted_keys(table.foreign_keys.keys()) {
            if let Some(foreign_key) = table.get_foreign_key(name) {
                ops.push(MigrationOp::new(
                    &table.name,
                    OpKind::AddForeignKey {
                        foreign_key: foreign_key.clone(),
                    },
                    false,
                ));
            }
        }
    }

    /// Column, index, and FK diff for a table present in both schemas.
    fn diff_table(live: &Table, target: &Table, ops: &mut Vec<MigrationOp>) {
        Self::diff_columns(live, target, ops);
        Self::diff_indexes(live, target, ops);
        Self::diff_foreign_keys(live, target, ops);
    }

    fn diff_columns(live: &Table, target: &Table, ops: &mut Vec<MigrationOp>) {
        // Adds.
        for name in sorted_keys(target.columns.keys()) {
            if live.get_column(name).is_none() {
                if let Some(column) = target.get_column(name) {
                    ops.push(MigrationOp::new(
                        &target.name,
                        OpKind::AddColumn {
                            column: column.clone(),
                        },
                        false,
                    ));
                }
            }
        }

        // Modifications.
        for name in sorted_keys(target.columns.keys()) {
            if let (Some(existing), Some(desired)) = (live.get_column(name), target.get_column(name))
                && existing.definition_differs(desired)
            {
                let destructive = compat::is_narrowing(&existing.sql_type, &desired.sql_type)
                    || (existing.nullable && !desired.nullable);
                ops.push(MigrationOp::new(
                    &target.name,
                    OpKind::ModifyColumn {
                        from: existing.clone(),
                        to: desired.clone(),
                    },
                    destructive,
                ));
            }
        }

        // Drops, always destructive.
        for name in sorted_keys(live.columns.keys()) {
            if target.get_column(name).is_none() {
                ops.push(MigrationOp::new(
                    &target.name,
                    OpKind::DropColumn {
                        column: name.to_string(),
                    },
                    true,
                ));
            }
        }
    }

    fn diff_indexes(live: &Table, target: &Table, ops: &mut Vec<MigrationOp>) {
        for name in union_keys(live.indexes.keys(), target.indexes.keys()) {
            match (live.get_index(&name), target.get_index(&name)) {
                (Some(_), None) => {
                    ops.push(MigrationOp::new(
                        &target.name,
                        OpKind::DropIndex { index: name },
                        false,
                    ));
                }
                (None, Some(index)) => {
                    ops.push(MigrationOp::new(
                        &target.name,
                        OpKind::AddIndex {
                            index: index.clone(),
                        },
                        false,
                    ));
                }
                // Changed definitions recreate: drop then add, adjacent.
                (Some(existing), Some(index)) if !existing.matches(index) => {
                    ops.push(MigrationOp::new(
                        &target.name,
                        OpKind::DropIndex { index: name },
                        false,
                    ));
                    ops.push(MigrationOp::new(
                        &target.name,
                        OpKind::AddIndex {
                            index: index.clone(),
                        },
                        false,
                    ));
                }
                _ => {}
            }
        }
    }

    fn diff_foreign_keys(live: &Table, target: &Table, ops: &mut Vec<MigrationOp>) {
        for name in union_keys(live.foreign_keys.keys(), target.foreign_keys.keys()) {
            match (live.get_foreign_key(&name), target.get_foreign_key(&name)) {
                (Some(_), None) => {
                    ops.push(MigrationOp::new(
                        &target.name,
                        OpKind::DropForeignKey { foreign_key: name },
                        false,
                    ));
                }
                (None, Some(foreign_key)) => {
                    ops.push(MigrationOp::new(
                        &target.name,
                        OpKind::AddForeignKey {
                            foreign_key: foreign_key.clone(),
                        },
                        false,
                    ));
                }
                (Some(existing), Some(foreign_key)) if !existing.matches(foreign_key) => {
                    ops.push(MigrationOp::new(
                        &target.name,
                        OpKind::DropForeignKey { foreign_key: name },
                        false,
                    ));
                    ops.push(MigrationOp::new(
                        &target.name,
                        OpKind::AddForeignKey {
                            foreign_key: foreign_key.clone(),
                        },
                        false,
                    ));
                }
                _ => {}
            }
        }
    }
}

/// Keys of one map, sorted.
fn sorted_keys<'a>(keys: impl Iterator<Item = &'a String>) -> Vec<&'a str> {
    let mut sorted: Vec<&str> = keys.map(String::as_str).collect();
    sorted.sort_unstable();
    sorted
}

/// Union of two key sets, sorted and deduplicated.
fn union_keys<'a>(
    left: impl Iterator<Item = &'a String>,
    right: impl Iterator<Item = &'a String>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut union: Vec<String> = Vec::new();
    for key in left.chain(right) {
        if seen.insert(key.as_str()) {
            union.push(key.clone());
        }
    }
    union.sort_unstable();
    union
}
