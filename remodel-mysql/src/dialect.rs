//! MySQL type mapping and DDL rendering.
//!
//! Statements come back without trailing semicolons; the migration engine
//! executes them one at a time and the script renderer adds its own
//! terminators.

use remodel_migrate::{MigrationOp, OpKind, SqlDialect};
use remodel_schema::{Column, ForeignKey, Index, IndexKind, ScalarType, Table, TypeMapper};

/// The MySQL dialect.
///
/// Stateless; a single value serves every table. Also used by MariaDB
/// connections, which accept the same DDL.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl TypeMapper for MySqlDialect {
    fn column_type(&self, scalar: ScalarType, field_name: &str) -> String {
        // Timestamp columns get DATETIME rather than TIMESTAMP so values
        // survive the 2038 rollover and time_zone settings.
        if matches!(field_name, "created_at" | "updated_at") {
            return "DATETIME".to_string();
        }

        match scalar {
            ScalarType::Int => "INT",
            ScalarType::BigInt => "BIGINT",
            ScalarType::Float => "DOUBLE",
            ScalarType::Decimal => "DECIMAL(10,2)",
            ScalarType::Boolean => "TINYINT(1)",
            ScalarType::String => "VARCHAR(255)",
            ScalarType::Text => "TEXT",
            ScalarType::DateTime => "DATETIME",
            ScalarType::Date => "DATE",
            ScalarType::Json => "JSON",
            ScalarType::Uuid => "CHAR(36)",
            ScalarType::Bytes => "BLOB",
        }
        .to_string()
    }

    fn timestamp_default(&self, field_name: &str) -> Option<String> {
        match field_name {
            "created_at" => Some("CURRENT_TIMESTAMP".to_string()),
            "updated_at" => Some("CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP".to_string()),
            _ => None,
        }
    }
}

impl SqlDialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn render(&self, op: &MigrationOp) -> Vec<String> {
        match &op.kind {
            OpKind::CreateTable { definition } => vec![self.create_table(definition)],
            OpKind::DropTable => {
                vec![format!("DROP TABLE {}", self.quote_ident(&op.table))]
            }
            OpKind::AddColumn { column } => vec![format!(
                "ALTER TABLE {} ADD COLUMN {}",
                self.quote_ident(&op.table),
                self.column_definition(column)
            )],
            // MODIFY COLUMN restates the full definition, so type,
            // nullability, and default all change in one statement.
            OpKind::ModifyColumn { to, .. } => vec![format!(
                "ALTER TABLE {} MODIFY COLUMN {}",
                self.quote_ident(&op.table),
                self.column_definition(to)
            )],
            OpKind::DropColumn { column } => vec![format!(
                "ALTER TABLE {} DROP COLUMN {}",
                self.quote_ident(&op.table),
                self.quote_ident(column)
            )],
            OpKind::AddIndex { index } => vec![self.create_index(&op.table, index)],
            OpKind::DropIndex { index } => vec![format!(
                "DROP INDEX {} ON {}",
                self.quote_ident(index),
                self.quote_ident(&op.table)
            )],
            OpKind::AddForeignKey { foreign_key } => {
                vec![self.add_foreign_key(&op.table, foreign_key)]
            }
            OpKind::DropForeignKey { foreign_key } => vec![format!(
                "ALTER TABLE {} DROP FOREIGN KEY {}",
                self.quote_ident(&op.table),
                self.quote_ident(foreign_key)
            )],
        }
    }
}

impl MySqlDialect {
    /// Generate a CREATE TABLE statement.
    fn create_table(&self, definition: &Table) -> String {
        let mut lines: Vec<String> = definition
            .columns
            .values()
            .map(|column| self.column_definition(column))
            .collect();

        let pk_columns: Vec<String> = definition
            .columns
            .values()
            .filter(|column| column.primary_key)
            .map(|column| self.quote_ident(&column.name))
            .collect();
        if !pk_columns.is_empty() {
            lines.push(format!("PRIMARY KEY ({})", pk_columns.join(", ")));
        }

        format!(
            "CREATE TABLE {} (\n    {}\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
            self.quote_ident(&definition.name),
            lines.join(",\n    ")
        )
    }

    /// Generate a column definition clause.
    fn column_definition(&self, column: &Column) -> String {
        let mut parts = vec![self.quote_ident(&column.name), column.sql_type.clone()];

        if let Some(expression) = &column.generated {
            let persistence = if column.stored { "STORED" } else { "VIRTUAL" };
            parts.push(format!("GENERATED ALWAYS AS ({expression}) {persistence}"));
        }

        // PRIMARY KEY in the table clause already implies NOT NULL.
        if !column.nullable && !column.primary_key {
            parts.push("NOT NULL".to_string());
        }

        if let Some(default) = &column.default {
            parts.push(format!("DEFAULT {default}"));
        }

        parts.join(" ")
    }

    /// Generate a CREATE INDEX statement.
    fn create_index(&self, table: &str, index: &Index) -> String {
        let kind = match index.kind {
            IndexKind::Index => "",
            IndexKind::Unique => "UNIQUE ",
            IndexKind::Fulltext => "FULLTEXT ",
        };
        let columns: Vec<String> = index
            .columns
            .iter()
            .map(|column| self.quote_ident(column))
            .collect();
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            kind,
            self.quote_ident(&index.name),
            self.quote_ident(table),
            columns.join(", ")
        )
    }

    /// Generate an ADD CONSTRAINT ... FOREIGN KEY statement.
    fn add_foreign_key(&self, table: &str, foreign_key: &ForeignKey) -> String {
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {}",
            self.quote_ident(table),
            self.quote_ident(&foreign_key.name),
            self.quote_ident(&foreign_key.column),
            self.quote_ident(&foreign_key.referenced_table),
            self.quote_ident(&foreign_key.referenced_column),
            foreign_key.on_delete.as_sql(),
            foreign_key.on_update.as_sql()
        )
    }
}
