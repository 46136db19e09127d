//! SQL script generation.
//!
//! A thin dispatcher: plan order in, dialect-rendered statements out. All
//! quoting, type mapping, and constraint syntax live in the dialect.

use crate::driver::SqlDialect;
use crate::op::MigrationOp;

/// Renders a plan's operations through one dialect.
pub struct SqlGenerator<'a, D: SqlDialect + ?Sized> {
    dialect: &'a D,
}

impl<'a, D: SqlDialect + ?Sized> SqlGenerator<'a, D> {
    /// Create a generator for the given dialect.
    pub fn new(dialect: &'a D) -> Self {
        Self { dialect }
    }

    /// All statements for the given operations, in plan order.
    pub fn statements(&self, operations: &[MigrationOp]) -> Vec<String> {
        operations
            .iter()
            .flat_map(|op| self.dialect.render(op))
            .collect()
    }

    /// A reviewable script: every statement `;`-terminated, one per line.
    pub fn script(&self, operations: &[MigrationOp]) -> String {
        let mut script = String::new();
        for statement in self.statements(operations) {
            script.push_str(&statement);
            script.push_str(";\n");
        }
        script
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::OpKind;
    use crate::testing::MemoryDriver;
    use remodel_schema::{Column, Schema};

    fn make_ops() -> Vec<MigrationOp> {
        vec![
            MigrationOp::new(
                "users",
                OpKind::AddColumn {
                    column: Column::new("email", "VARCHAR(255)"),
                },
                false,
            ),
            MigrationOp::new(
                "users",
                OpKind::ModifyColumn {
                    from: Column::new("name", "VARCHAR(100)"),
                    to: Column::new("name", "VARCHAR(255)"),
                },
                false,
            ),
        ]
    }

    #[test]
    fn test_statements_preserve_plan_order_and_flatten() {
        let driver = MemoryDriver::new(Schema::new());
        let generator = SqlGenerator::new(&driver);

        let statements = generator.statements(&make_ops());
        assert_eq!(
            statements,
            [
                "addColumn:users.email",
                "modifyColumn:users.name#1",
                "modifyColumn:users.name#2",
            ]
        );
    }

    #[test]
    fn test_script_terminates_every_statement() {
        let driver = MemoryDriver::new(Schema::new());
        let generator = SqlGenerator::new(&driver);

        let script = generator.script(&make_ops());
        assert_eq!(script.matches(";\n").count(), 3);
        assert!(script.ends_with(";\n"));
    }

    #[test]
    fn test_empty_plan_renders_empty_script() {
        let driver = MemoryDriver::new(Schema::new());
        let generator = SqlGenerator::new(&driver);
        assert!(generator.script(&[]).is_empty());
    }
}
