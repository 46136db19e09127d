//! PostgreSQL type mapping and DDL rendering.
//!
//! Statements come back without trailing semicolons; the migration engine
//! executes them one at a time and the script renderer adds its own
//! terminators.

use remodel_migrate::{MigrationOp, OpKind, SqlDialect};
use remodel_schema::{Column, ForeignKey, Index, IndexKind, ScalarType, Table, TypeMapper};

/// The PostgreSQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl TypeMapper for PostgresDialect {
    fn column_type(&self, scalar: ScalarType, field_name: &str) -> String {
        if matches!(field_name, "created_at" | "updated_at") {
            return "TIMESTAMPTZ".to_string();
        }

        match scalar {
            ScalarType::Int => "INTEGER",
            ScalarType::BigInt => "BIGINT",
            ScalarType::Float => "DOUBLE PRECISION",
            ScalarType::Decimal => "NUMERIC(10,2)",
            ScalarType::Boolean => "BOOLEAN",
            ScalarType::String => "VARCHAR(255)",
            ScalarType::Text => "TEXT",
            ScalarType::DateTime => "TIMESTAMPTZ",
            ScalarType::Date => "DATE",
            ScalarType::Json => "JSONB",
            ScalarType::Uuid => "UUID",
            ScalarType::Bytes => "BYTEA",
        }
        .to_string()
    }

    fn timestamp_default(&self, field_name: &str) -> Option<String> {
        // No ON UPDATE clause here; Postgres would need a trigger, and the
        // catalog reports plain `now()` either way.
        match field_name {
            "created_at" | "updated_at" => Some("now()".to_string()),
            _ => None,
        }
    }
}

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
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
            OpKind::ModifyColumn { from, to } => self.modify_column(&op.table, from, to),
            OpKind::DropColumn { column } => vec![format!(
                "ALTER TABLE {} DROP COLUMN {}",
                self.quote_ident(&op.table),
                self.quote_ident(column)
            )],
            OpKind::AddIndex { index } => vec![self.create_index(&op.table, index)],
            // Indexes are schema-scoped objects; no ON clause.
            OpKind::DropIndex { index } => {
                vec![format!("DROP INDEX {}", self.quote_ident(index))]
            }
            OpKind::AddForeignKey { foreign_key } => {
                vec![self.add_foreign_key(&op.table, foreign_key)]
            }
            OpKind::DropForeignKey { foreign_key } => vec![format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                self.quote_ident(&op.table),
                self.quote_ident(foreign_key)
            )],
        }
    }
}

impl PostgresDialect {
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
            "CREATE TABLE {} (\n    {}\n)",
            self.quote_ident(&definition.name),
            lines.join(",\n    ")
        )
    }

    /// Generate a column definition clause.
    fn column_definition(&self, column: &Column) -> String {
        let mut parts = vec![self.quote_ident(&column.name), column.sql_type.clone()];

        // Postgres only has stored generated columns.
        if let Some(expression) = &column.generated {
            parts.push(format!("GENERATED ALWAYS AS ({expression}) STORED"));
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

    /// Generate the ALTER COLUMN statements for a definition change, one
    /// per changed attribute.
    fn modify_column(&self, table: &str, from: &Column, to: &Column) -> Vec<String> {
        let table_ident = self.quote_ident(table);
        let column_ident = self.quote_ident(&to.name);
        let mut statements = Vec::new();

        if from.sql_type != to.sql_type {
            statements.push(format!(
                "ALTER TABLE {table_ident} ALTER COLUMN {column_ident} TYPE {} USING {column_ident}::{}",
                to.sql_type, to.sql_type
            ));
        }

        if from.nullable != to.nullable {
            let clause = if to.nullable {
                "DROP NOT NULL"
            } else {
                "SET NOT NULL"
            };
            statements.push(format!(
                "ALTER TABLE {table_ident} ALTER COLUMN {column_ident} {clause}"
            ));
        }

        if from.default != to.default {
            let clause = match &to.default {
                Some(default) => format!("SET DEFAULT {default}"),
                None => "DROP DEFAULT".to_string(),
            };
            statements.push(format!(
                "ALTER TABLE {table_ident} ALTER COLUMN {column_ident} {clause}"
            ));
        }

        statements
    }

    /// Generate a CREATE INDEX statement.
    ///
    /// Fulltext hints become GIN indexes over a `to_tsvector` expression,
    /// the closest Postgres equivalent of MySQL's FULLTEXT.
    fn create_index(&self, table: &str, index: &Index) -> String {
        match index.kind {
            IndexKind::Fulltext => {
                let document = index
                    .columns
                    .iter()
                    .map(|column| self.quote_ident(column))
                    .collect::<Vec<_>>()
                    .join(" || ' ' || ");
                format!(
                    "CREATE INDEX {} ON {} USING GIN (to_tsvector('english', {}))",
                    self.quote_ident(&index.name),
                    self.quote_ident(table),
                    document
                )
            }
            kind => {
                let unique = if kind == IndexKind::Unique {
                    "UNIQUE "
                } else {
                    ""
                };
                let columns: Vec<String> = index
                    .columns
                    .iter()
                    .map(|column| self.quote_ident(column))
                    .collect();
                format!(
                    "CREATE {}INDEX {} ON {} ({})",
                    unique,
                    self.quote_ident(&index.name),
                    self.quote_ident(table),
                    columns.join(", ")
                )
            }
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn op(table: &str, kind: OpKind) -> MigrationOp {
        // Rendering ignores the destructive flag.
        MigrationOp::new(table, kind, false)
    }

    fn render(op: &MigrationOp) -> Vec<String> {
        PostgresDialect.render(op)
    }

    fn render_one(op: &MigrationOp) -> String {
        let statements = render(op);
        assert_eq!(statements.len(), 1, "expected a single statement");
        statements.into_iter().next().unwrap()
    }

    // ==================== Type Mapping Tests ====================

    #[test]
    fn test_scalar_type_mapping() {
        let dialect = PostgresDialect;
        assert_eq!(dialect.column_type(ScalarType::Int, "age"), "INTEGER");
        assert_eq!(dialect.column_type(ScalarType::BigInt, "views"), "BIGINT");
        assert_eq!(
            dialect.column_type(ScalarType::Float, "score"),
            "DOUBLE PRECISION"
        );
        assert_eq!(
            dialect.column_type(ScalarType::Decimal, "price"),
            "NUMERIC(10,2)"
        );
        assert_eq!(
            dialect.column_type(ScalarType::Boolean, "active"),
            "BOOLEAN"
        );
        assert_eq!(
            dialect.column_type(ScalarType::String, "email"),
            "VARCHAR(255)"
        );
        assert_eq!(dialect.column_type(ScalarType::Text, "body"), "TEXT");
        assert_eq!(
            dialect.column_type(ScalarType::DateTime, "published_at"),
            "TIMESTAMPTZ"
        );
        assert_eq!(dialect.column_type(ScalarType::Date, "born_on"), "DATE");
        assert_eq!(dialect.column_type(ScalarType::Json, "settings"), "JSONB");
        assert_eq!(dialect.column_type(ScalarType::Uuid, "id"), "UUID");
        assert_eq!(dialect.column_type(ScalarType::Bytes, "avatar"), "BYTEA");
    }

    #[test]
    fn test_timestamp_defaults() {
        let dialect = PostgresDialect;
        assert_eq!(
            dialect.timestamp_default("created_at").as_deref(),
            Some("now()")
        );
        assert_eq!(
            dialect.timestamp_default("updated_at").as_deref(),
            Some("now()")
        );
        assert_eq!(dialect.timestamp_default("published_at"), None);
    }

    // ==================== Identifier Tests ====================

    #[test]
    fn test_quote_ident() {
        assert_eq!(PostgresDialect.quote_ident("users"), "\"users\"");
        assert_eq!(PostgresDialect.quote_ident("odd\"name"), "\"odd\"\"name\"");
    }

    // ==================== Table Rendering Tests ====================

    #[test]
    fn test_render_create_table() {
        let mut table = Table::new("users");
        table.add_column(Column::new("id", "UUID").primary_key());
        table.add_column(Column::new("email", "VARCHAR(255)"));
        table.add_column(Column::new("bio", "TEXT").nullable(true));
        table.add_column(Column::new("created_at", "TIMESTAMPTZ").default_expr("now()"));

        let sql = render_one(&op("users", OpKind::CreateTable { definition: table }));
        assert_eq!(
            sql,
            "CREATE TABLE \"users\" (\n    \
             \"id\" UUID,\n    \
             \"email\" VARCHAR(255) NOT NULL,\n    \
             \"bio\" TEXT,\n    \
             \"created_at\" TIMESTAMPTZ NOT NULL DEFAULT now(),\n    \
             PRIMARY KEY (\"id\")\n\
             )"
        );
    }

    #[test]
    fn test_render_drop_table() {
        let sql = render_one(&op("legacy_sessions", OpKind::DropTable));
        assert_eq!(sql, "DROP TABLE \"legacy_sessions\"");
    }

    // ==================== Column Rendering Tests ====================

    #[test]
    fn test_render_add_column() {
        let column = Column::new("nickname", "VARCHAR(255)").nullable(true);
        let sql = render_one(&op("users", OpKind::AddColumn { column }));
        assert_eq!(
            sql,
            "ALTER TABLE \"users\" ADD COLUMN \"nickname\" VARCHAR(255)"
        );
    }

    #[test]
    fn test_render_add_generated_column() {
        let column = Column::new("search_text", "TEXT")
            .nullable(true)
            .generated_as("first_name || ' ' || last_name", false);
        let sql = render_one(&op("users", OpKind::AddColumn { column }));
        // Stored even when the desired column is virtual; Postgres has no
        // virtual generated columns.
        assert_eq!(
            sql,
            "ALTER TABLE \"users\" ADD COLUMN \"search_text\" TEXT \
             GENERATED ALWAYS AS (first_name || ' ' || last_name) STORED"
        );
    }

    #[test]
    fn test_render_modify_column_type_change() {
        let from = Column::new("email", "VARCHAR(255)");
        let to = Column::new("email", "TEXT");
        let statements = render(&op("users", OpKind::ModifyColumn { from, to }));
        assert_eq!(
            statements,
            ["ALTER TABLE \"users\" ALTER COLUMN \"email\" TYPE TEXT USING \"email\"::TEXT"]
        );
    }

    #[test]
    fn test_render_modify_column_one_statement_per_change() {
        let from = Column::new("email", "VARCHAR(255)").nullable(true);
        let to = Column::new("email", "TEXT").default_expr("''");
        let statements = render(&op("users", OpKind::ModifyColumn { from, to }));
        assert_eq!(
            statements,
            [
                "ALTER TABLE \"users\" ALTER COLUMN \"email\" TYPE TEXT USING \"email\"::TEXT",
                "ALTER TABLE \"users\" ALTER COLUMN \"email\" SET NOT NULL",
                "ALTER TABLE \"users\" ALTER COLUMN \"email\" SET DEFAULT ''",
            ]
        );
    }

    #[test]
    fn test_render_modify_column_drops_default() {
        let from = Column::new("active", "BOOLEAN").default_expr("true");
        let to = Column::new("active", "BOOLEAN");
        let statements = render(&op("users", OpKind::ModifyColumn { from, to }));
        assert_eq!(
            statements,
            ["ALTER TABLE \"users\" ALTER COLUMN \"active\" DROP DEFAULT"]
        );
    }

    #[test]
    fn test_render_modify_column_relaxes_nullability() {
        let from = Column::new("bio", "TEXT");
        let to = Column::new("bio", "TEXT").nullable(true);
        let statements = render(&op("users", OpKind::ModifyColumn { from, to }));
        assert_eq!(
            statements,
            ["ALTER TABLE \"users\" ALTER COLUMN \"bio\" DROP NOT NULL"]
        );
    }

    #[test]
    fn test_render_drop_column() {
        let sql = render_one(&op(
            "users",
            OpKind::DropColumn {
                column: "legacy_flag".to_string(),
            },
        ));
        assert_eq!(sql, "ALTER TABLE \"users\" DROP COLUMN \"legacy_flag\"");
    }

    // ==================== Index Rendering Tests ====================

    #[test]
    fn test_render_add_index() {
        let index = Index::new("idx_users_email", ["email"], IndexKind::Index);
        let sql = render_one(&op("users", OpKind::AddIndex { index }));
        assert_eq!(
            sql,
            "CREATE INDEX \"idx_users_email\" ON \"users\" (\"email\")"
        );
    }

    #[test]
    fn test_render_add_unique_index() {
        let index = Index::new("uniq_users_email", ["email"], IndexKind::Unique);
        let sql = render_one(&op("users", OpKind::AddIndex { index }));
        assert_eq!(
            sql,
            "CREATE UNIQUE INDEX \"uniq_users_email\" ON \"users\" (\"email\")"
        );
    }

    #[test]
    fn test_render_fulltext_index_uses_gin() {
        let index = Index::new("ft_posts_body", ["title", "body"], IndexKind::Fulltext);
        let sql = render_one(&op("posts", OpKind::AddIndex { index }));
        assert_eq!(
            sql,
            "CREATE INDEX \"ft_posts_body\" ON \"posts\" \
             USING GIN (to_tsvector('english', \"title\" || ' ' || \"body\"))"
        );
    }

    #[test]
    fn test_render_drop_index_has_no_table() {
        let sql = render_one(&op(
            "users",
            OpKind::DropIndex {
                index: "idx_users_email".to_string(),
            },
        ));
        assert_eq!(sql, "DROP INDEX \"idx_users_email\"");
    }

    // ==================== Foreign Key Rendering Tests ====================

    #[test]
    fn test_render_add_foreign_key() {
        let foreign_key = ForeignKey::new("fk_posts_author_id", "author_id", "users", "id");
        let sql = render_one(&op("posts", OpKind::AddForeignKey { foreign_key }));
        assert_eq!(
            sql,
            "ALTER TABLE \"posts\" ADD CONSTRAINT \"fk_posts_author_id\" \
             FOREIGN KEY (\"author_id\") REFERENCES \"users\" (\"id\") \
             ON DELETE RESTRICT ON UPDATE CASCADE"
        );
    }

    #[test]
    fn test_render_drop_foreign_key_uses_drop_constraint() {
        let sql = render_one(&op(
            "posts",
            OpKind::DropForeignKey {
                foreign_key: "fk_posts_author_id".to_string(),
            },
        ));
        assert_eq!(
            sql,
            "ALTER TABLE \"posts\" DROP CONSTRAINT \"fk_posts_author_id\""
        );
    }
}
