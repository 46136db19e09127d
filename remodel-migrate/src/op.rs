//! Migration plan operations and the persisted plan.
//!
//! A [`MigrationPlan`] is an ordered list of [`MigrationOp`]s plus the
//! timestamps that track its lifecycle. The serialized form is the on-disk
//! `plan.json`: each entry carries a camelCase `op` tag, the owning `table`,
//! the operation payload, and a `destructive` flag.

use std::fmt;

use chrono::{DateTime, Utc};
use remodel_schema::{Column, ForeignKey, Index, Table};
use serde::{Deserialize, Serialize};

/// The payload of a single plan operation, tagged by operation name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum OpKind {
    /// Create a table; the definition holds columns only, indexes and
    /// foreign keys arrive as separate ops on the same table.
    CreateTable {
        /// Columns of the new table.
        definition: Table,
    },
    /// Drop the table.
    DropTable,
    /// Add a column.
    AddColumn {
        /// The column to add.
        column: Column,
    },
    /// Change a column definition in place.
    ModifyColumn {
        /// Current definition in the live schema.
        from: Column,
        /// Desired definition.
        to: Column,
    },
    /// Drop a column.
    DropColumn {
        /// Name of the column to drop.
        column: String,
    },
    /// Add an index.
    AddIndex {
        /// The index to add.
        index: Index,
    },
    /// Drop an index by name.
    DropIndex {
        /// Name of the index to drop.
        index: String,
    },
    /// Add a foreign-key constraint.
    AddForeignKey {
        /// The constraint to add.
        foreign_key: ForeignKey,
    },
    /// Drop a foreign-key constraint by name.
    DropForeignKey {
        /// Name of the constraint to drop.
        foreign_key: String,
    },
}

/// One entry of a migration plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationOp {
    /// The table the operation targets.
    pub table: String,
    /// The operation payload.
    #[serde(flatten)]
    pub kind: OpKind,
    /// Whether applying this operation can lose data.
    pub destructive: bool,
}

impl MigrationOp {
    /// Create an operation on the given table.
    pub fn new(table: impl Into<String>, kind: OpKind, destructive: bool) -> Self {
        Self {
            table: table.into(),
            kind,
            destructive,
        }
    }

    /// The camelCase operation name, matching the serialized `op` tag.
    pub fn op_name(&self) -> &'static str {
        match &self.kind {
            OpKind::CreateTable { .. } => "createTable",
            OpKind::DropTable => "dropTable",
            OpKind::AddColumn { .. } => "addColumn",
            OpKind::ModifyColumn { .. } => "modifyColumn",
            OpKind::DropColumn { .. } => "dropColumn",
            OpKind::AddIndex { .. } => "addIndex",
            OpKind::DropIndex { .. } => "dropIndex",
            OpKind::AddForeignKey { .. } => "addForeignKey",
            OpKind::DropForeignKey { .. } => "dropForeignKey",
        }
    }

    /// A stable identifier for this operation, recorded in the ledger.
    ///
    /// Table-level ops are `<op>:<table>`; everything else appends the
    /// affected column, index, or constraint name.
    pub fn identifier(&self) -> String {
        let target = match &self.kind {
            OpKind::CreateTable { .. } | OpKind::DropTable => None,
            OpKind::AddColumn { column } => Some(column.name.as_str()),
            OpKind::ModifyColumn { to, .. } => Some(to.name.as_str()),
            OpKind::DropColumn { column } => Some(column.as_str()),
            OpKind::AddIndex { index } => Some(index.name.as_str()),
            OpKind::DropIndex { index } => Some(index.as_str()),
            OpKind::AddForeignKey { foreign_key } => Some(foreign_key.name.as_str()),
            OpKind::DropForeignKey { foreign_key } => Some(foreign_key.as_str()),
        };
        match target {
            Some(target) => format!("{}:{}.{}", self.op_name(), self.table, target),
            None => format!("{}:{}", self.op_name(), self.table),
        }
    }
}

impl fmt::Display for MigrationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.destructive {
            write!(f, "{} [destructive]", self.identifier())
        } else {
            f.write_str(&self.identifier())
        }
    }
}

/// A generated migration plan, serialized as `plan.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationPlan {
    /// When the plan was generated.
    pub generated_at: DateTime<Utc>,
    /// Ordered operations.
    #[serde(rename = "plan")]
    pub operations: Vec<MigrationOp>,
    /// Warnings collected during extraction and diffing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Set once the plan has been applied successfully.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
}

impl MigrationPlan {
    /// Create a plan generated now.
    pub fn new(operations: Vec<MigrationOp>) -> Self {
        Self {
            generated_at: Utc::now(),
            operations,
            warnings: Vec::new(),
            applied_at: None,
        }
    }

    /// Attach warnings to the plan.
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the plan contains no operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Whether the plan has been applied.
    pub fn is_applied(&self) -> bool {
        self.applied_at.is_some()
    }

    /// The destructive operations in plan order.
    pub fn destructive_ops(&self) -> Vec<&MigrationOp> {
        self.operations.iter().filter(|op| op.destructive).collect()
    }

    /// The non-destructive operations in plan order.
    pub fn non_destructive_ops(&self) -> Vec<&MigrationOp> {
        self.operations.iter().filter(|op| !op.destructive).collect()
    }

    /// Number of destructive operations.
    pub fn destructive_count(&self) -> usize {
        self.operations.iter().filter(|op| op.destructive).count()
    }

    /// Ledger identifiers for every operation, in plan order.
    pub fn identifiers(&self) -> Vec<String> {
        self.operations.iter().map(MigrationOp::identifier).collect()
    }

    /// Mark the plan applied now.
    pub fn mark_applied(&mut self) {
        self.applied_at = Some(Utc::now());
    }

    /// Get a human-readable summary of the plan.
    pub fn summary(&self) -> String {
        let mut tables_created = 0;
        let mut tables_dropped = 0;
        let mut columns_added = 0;
        let mut columns_modified = 0;
        let mut columns_dropped = 0;
        let mut index_changes = 0;
        let mut fk_changes = 0;

        for op in &self.operations {
            match &op.kind {
                OpKind::CreateTable { .. } => tables_created += 1,
                OpKind::DropTable => tables_dropped += 1,
                OpKind::AddColumn { .. } => columns_added += 1,
                OpKind::ModifyColumn { .. } => columns_modified += 1,
                OpKind::DropColumn { .. } => columns_dropped += 1,
                OpKind::AddIndex { .. } | OpKind::DropIndex { .. } => index_changes += 1,
                OpKind::AddForeignKey { .. } | OpKind::DropForeignKey { .. } => fk_changes += 1,
            }
        }

        let mut parts = Vec::new();
        if tables_created > 0 {
            parts.push(format!("{} tables to create", tables_created));
        }
        if tables_dropped > 0 {
            parts.push(format!("{} tables to drop", tables_dropped));
        }
        if columns_added > 0 {
            parts.push(format!("{} columns to add", columns_added));
        }
        if columns_modified > 0 {
            parts.push(format!("{} columns to modify", columns_modified));
        }
        if columns_dropped > 0 {
            parts.push(format!("{} columns to drop", columns_dropped));
        }
        if index_changes > 0 {
            parts.push(format!("{} index changes", index_changes));
        }
        if fk_changes > 0 {
            parts.push(format!("{} foreign key changes", fk_changes));
        }

        if parts.is_empty() {
            "No changes".to_string()
        } else {
            let mut summary = parts.join(", ");
            let destructive = self.destructive_count();
            if destructive > 0 {
                summary.push_str(&format!(" ({} destructive)", destructive));
            }
            summary
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remodel_schema::IndexKind;

    fn make_add_column() -> MigrationOp {
        MigrationOp::new(
            "users",
            OpKind::AddColumn {
                column: Column::new("email", "VARCHAR(255)"),
            },
            false,
        )
    }

    // ==================== Identifier Tests ====================

    #[test]
    fn test_identifiers() {
        let mut definition = Table::new("users");
        definition.add_column(Column::new("id", "CHAR(36)").primary_key());

        let create = MigrationOp::new("users", OpKind::CreateTable { definition }, false);
        assert_eq!(create.identifier(), "createTable:users");

        assert_eq!(make_add_column().identifier(), "addColumn:users.email");

        let drop_index = MigrationOp::new(
            "users",
            OpKind::DropIndex {
                index: "idx_users_email".to_string(),
            },
            false,
        );
        assert_eq!(drop_index.identifier(), "dropIndex:users.idx_users_email");

        let drop_table = MigrationOp::new("legacy", OpKind::DropTable, true);
        assert_eq!(drop_table.identifier(), "dropTable:legacy");
        assert_eq!(drop_table.to_string(), "dropTable:legacy [destructive]");
    }

    // ==================== Serde Tests ====================

    #[test]
    fn test_op_wire_format() {
        let json = serde_json::to_value(make_add_column()).unwrap();
        assert_eq!(json["op"], "addColumn");
        assert_eq!(json["table"], "users");
        assert_eq!(json["destructive"], false);
        assert_eq!(json["column"]["name"], "email");
    }

    #[test]
    fn test_modify_column_wire_format() {
        let op = MigrationOp::new(
            "users",
            OpKind::ModifyColumn {
                from: Column::new("email", "VARCHAR(100)"),
                to: Column::new("email", "VARCHAR(50)"),
            },
            true,
        );
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["op"], "modifyColumn");
        assert_eq!(json["from"]["sql_type"], "VARCHAR(100)");
        assert_eq!(json["to"]["sql_type"], "VARCHAR(50)");
        assert_eq!(json["destructive"], true);
    }

    #[test]
    fn test_plan_json_roundtrip() {
        let plan = MigrationPlan::new(vec![
            make_add_column(),
            MigrationOp::new(
                "users",
                OpKind::AddIndex {
                    index: Index::new("uniq_users_email", ["email"], IndexKind::Unique),
                },
                false,
            ),
        ])
        .with_warnings(vec!["Draft.mystery: field declares no type".to_string()]);

        let json = serde_json::to_string_pretty(&plan).unwrap();
        let back: MigrationPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(back, plan);
        assert!(json.contains("\"plan\""));
        assert!(json.contains("\"generated_at\""));
        // applied_at is omitted until set
        assert!(!json.contains("applied_at"));
    }

    #[test]
    fn test_plan_applied_at_persists() {
        let mut plan = MigrationPlan::new(vec![make_add_column()]);
        assert!(!plan.is_applied());
        plan.mark_applied();

        let json = serde_json::to_string(&plan).unwrap();
        let back: MigrationPlan = serde_json::from_str(&json).unwrap();
        assert!(back.is_applied());
    }

    // ==================== Summary Tests ====================

    #[test]
    fn test_empty_plan_summary() {
        let plan = MigrationPlan::new(Vec::new());
        assert!(plan.is_empty());
        assert_eq!(plan.summary(), "No changes");
    }

    #[test]
    fn test_summary_counts_and_destructive() {
        let plan = MigrationPlan::new(vec![
            make_add_column(),
            MigrationOp::new(
                "users",
                OpKind::DropColumn {
                    column: "legacy_flag".to_string(),
                },
                true,
            ),
            MigrationOp::new("old_stuff", OpKind::DropTable, true),
        ]);

        let summary = plan.summary();
        assert!(summary.contains("1 columns to add"));
        assert!(summary.contains("1 columns to drop"));
        assert!(summary.contains("1 tables to drop"));
        assert!(summary.contains("(2 destructive)"));
        assert_eq!(plan.destructive_count(), 2);
        assert_eq!(plan.destructive_ops().len(), 2);
        assert_eq!(plan.non_destructive_ops().len(), 1);
    }
}
