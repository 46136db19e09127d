//! PostgreSQL driver: catalog queries and DDL execution over `tokio-postgres`.

use std::collections::BTreeSet;

use async_trait::async_trait;
use indexmap::IndexMap;
use remodel_migrate::{
    Driver, DriverRegistry, MigrateResult, MigrationError, MigrationOp, SqlDialect,
};
use remodel_schema::{
    Column, ForeignKey, Index, IndexKind, ReferentialAction, ScalarType, TypeMapper,
};
use tokio_postgres::{Client, NoTls};
use tracing::{debug, info, warn};

use crate::dialect::PostgresDialect;

mod queries {
    pub const TABLES: &str = "\
        SELECT table_name \
        FROM information_schema.tables \
        WHERE table_schema = $1 AND table_type = 'BASE TABLE' \
        ORDER BY table_name";

    pub const COLUMNS: &str = "\
        SELECT column_name, data_type, udt_name, is_nullable, column_default, \
               character_maximum_length, numeric_precision, numeric_scale, \
               is_generated, generation_expression \
        FROM information_schema.columns \
        WHERE table_schema = $1 AND table_name = $2 \
        ORDER BY ordinal_position";

    pub const PRIMARY_KEYS: &str = "\
        SELECT a.attname \
        FROM pg_index i \
        JOIN pg_class c ON c.oid = i.indrelid \
        JOIN pg_namespace n ON n.oid = c.relnamespace \
        JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = ANY(i.indkey) \
        WHERE i.indisprimary AND n.nspname = $1 AND c.relname = $2 \
        ORDER BY array_position(i.indkey, a.attnum)";

    // One row per index element; expression elements come back as the
    // expression text rather than a column name.
    pub const INDEXES: &str = "\
        SELECT i.relname, ix.indisunique, am.amname, \
               pg_get_indexdef(ix.indexrelid, k.n, true) \
        FROM pg_index ix \
        JOIN pg_class t ON t.oid = ix.indrelid \
        JOIN pg_class i ON i.oid = ix.indexrelid \
        JOIN pg_namespace n ON n.oid = t.relnamespace \
        JOIN pg_am am ON am.oid = i.relam \
        CROSS JOIN LATERAL generate_series(1, ix.indnatts::int) AS k(n) \
        WHERE n.nspname = $1 AND t.relname = $2 \
        ORDER BY i.relname, k.n";

    pub const FOREIGN_KEYS: &str = "\
        SELECT tc.constraint_name, kcu.column_name, \
               ccu.table_name, ccu.column_name, \
               rc.delete_rule, rc.update_rule \
        FROM information_schema.table_constraints tc \
        JOIN information_schema.key_column_usage kcu \
          ON kcu.constraint_schema = tc.constraint_schema \
         AND kcu.constraint_name = tc.constraint_name \
        JOIN information_schema.constraint_column_usage ccu \
          ON ccu.constraint_schema = tc.constraint_schema \
         AND ccu.constraint_name = tc.constraint_name \
        JOIN information_schema.referential_constraints rc \
          ON rc.constraint_schema = tc.constraint_schema \
         AND rc.constraint_name = tc.constraint_name \
        WHERE tc.constraint_type = 'FOREIGN KEY' \
          AND tc.table_schema = $1 AND tc.table_name = $2 \
        ORDER BY tc.constraint_name, kcu.ordinal_position";
}

/// A PostgreSQL migration driver.
///
/// Catalog queries are scoped to a single namespace, `public` unless
/// overridden with [`PostgresDriver::with_schema`].
pub struct PostgresDriver {
    client: Client,
    database: String,
    schema: String,
}

impl PostgresDriver {
    /// Connect using a `postgres://` URL or key-value connection string.
    pub async fn connect(url: &str) -> MigrateResult<Self> {
        let (client, connection) = tokio_postgres::connect(url, NoTls)
            .await
            .map_err(|e| MigrationError::connection(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "PostgreSQL connection task ended");
            }
        });

        let row = client
            .query_one("SELECT current_database()", &[])
            .await
            .map_err(|e| MigrationError::connection(e.to_string()))?;
        let database: String = row.get(0);

        info!(database = %database, "Connected to PostgreSQL");
        Ok(Self {
            client,
            database,
            schema: "public".to_string(),
        })
    }

    /// Scope introspection to a namespace other than `public`.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }
}

impl TypeMapper for PostgresDriver {
    fn column_type(&self, scalar: ScalarType, field_name: &str) -> String {
        PostgresDialect.column_type(scalar, field_name)
    }

    fn timestamp_default(&self, field_name: &str) -> Option<String> {
        PostgresDialect.timestamp_default(field_name)
    }
}

impl SqlDialect for PostgresDriver {
    fn name(&self) -> &'static str {
        PostgresDialect.name()
    }

    fn quote_ident(&self, ident: &str) -> String {
        PostgresDialect.quote_ident(ident)
    }

    fn render(&self, op: &MigrationOp) -> Vec<String> {
        PostgresDialect.render(op)
    }
}

#[async_trait]
impl Driver for PostgresDriver {
    async fn database_name(&self) -> MigrateResult<String> {
        Ok(self.database.clone())
    }

    async fn tables(&self, database: &str) -> MigrateResult<Vec<String>> {
        debug!(database = %database, schema = %self.schema, "Listing tables");
        let rows = self
            .client
            .query(queries::TABLES, &[&self.schema])
            .await
            .map_err(|e| MigrationError::database(e.to_string()))?;
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    async fn columns(
        &self,
        database: &str,
        table: &str,
    ) -> MigrateResult<IndexMap<String, Column>> {
        debug!(database = %database, table = %table, "Introspecting columns");
        let pk_rows = self
            .client
            .query(queries::PRIMARY_KEYS, &[&self.schema, &table])
            .await
            .map_err(|e| MigrationError::database(e.to_string()))?;
        let primary: BTreeSet<String> = pk_rows.iter().map(|row| row.get(0)).collect();

        let rows = self
            .client
            .query(queries::COLUMNS, &[&self.schema, &table])
            .await
            .map_err(|e| MigrationError::database(e.to_string()))?;

        let mut columns = IndexMap::new();
        for row in rows {
            let column_row = ColumnRow {
                name: row.get(0),
                data_type: row.get(1),
                udt_name: row.get(2),
                is_nullable: row.get(3),
                default: row.try_get(4).ok().flatten(),
                max_length: row.try_get(5).ok().flatten(),
                precision: row.try_get(6).ok().flatten(),
                scale: row.try_get(7).ok().flatten(),
                is_generated: row.get(8),
                generation_expression: row.try_get(9).ok().flatten(),
            };
            let is_primary = primary.contains(&column_row.name);
            let column = column_row.into_column(is_primary);
            columns.insert(column.name.clone(), column);
        }
        Ok(columns)
    }

    async fn indexes(&self, database: &str, table: &str) -> MigrateResult<IndexMap<String, Index>> {
        debug!(database = %database, table = %table, "Introspecting indexes");
        let rows = self
            .client
            .query(queries::INDEXES, &[&self.schema, &table])
            .await
            .map_err(|e| MigrationError::database(e.to_string()))?;

        let mut indexes: IndexMap<String, Index> = IndexMap::new();
        for row in rows {
            let name: String = row.get(0);
            let is_unique: bool = row.get(1);
            let method: String = row.get(2);
            let element: String = row.get(3);

            let kind = index_kind(is_unique, &method);
            let index = indexes
                .entry(name.clone())
                .or_insert_with(|| Index::new(name, Vec::<String>::new(), kind));
            for column in index_element_columns(&element) {
                if !index.columns.contains(&column) {
                    index.columns.push(column);
                }
            }
        }
        Ok(indexes)
    }

    async fn foreign_keys(
        &self,
        database: &str,
        table: &str,
    ) -> MigrateResult<IndexMap<String, ForeignKey>> {
        debug!(database = %database, table = %table, "Introspecting foreign keys");
        let rows = self
            .client
            .query(queries::FOREIGN_KEYS, &[&self.schema, &table])
            .await
            .map_err(|e| MigrationError::database(e.to_string()))?;

        let mut foreign_keys: IndexMap<String, ForeignKey> = IndexMap::new();
        for row in rows {
            let name: String = row.get(0);
            let column: String = row.get(1);
            let referenced_table: String = row.get(2);
            let referenced_column: String = row.get(3);
            let delete_rule: String = row.get(4);
            let update_rule: String = row.get(5);

            // First row wins; the schema model is single-column.
            foreign_keys.entry(name.clone()).or_insert_with(|| {
                ForeignKey::new(name, column, referenced_table, referenced_column)
                    .on_delete(ReferentialAction::from_sql(&delete_rule))
                    .on_update(ReferentialAction::from_sql(&update_rule))
            });
        }
        Ok(foreign_keys)
    }

    async fn execute(&self, statement: &str) -> MigrateResult<u64> {
        debug!(statement = %statement, "Executing statement");
        self.client
            .execute(statement, &[])
            .await
            .map_err(|e| MigrationError::database(e.to_string()))
    }
}

/// Register the PostgreSQL connector under the `postgres` and `postgresql`
/// schemes.
pub fn register(registry: &mut DriverRegistry) {
    for scheme in ["postgres", "postgresql"] {
        registry.register(scheme, |url: String| async move {
            Ok(Box::new(PostgresDriver::connect(&url).await?) as Box<dyn Driver>)
        });
    }
}

/// One row of `information_schema.columns`, in catalog vocabulary.
struct ColumnRow {
    name: String,
    data_type: String,
    udt_name: String,
    is_nullable: String,
    default: Option<String>,
    max_length: Option<i32>,
    precision: Option<i32>,
    scale: Option<i32>,
    is_generated: String,
    generation_expression: Option<String>,
}

impl ColumnRow {
    fn into_column(self, primary_key: bool) -> Column {
        let sql_type = render_type(
            &self.data_type,
            &self.udt_name,
            self.max_length,
            self.precision,
            self.scale,
        );
        let mut column =
            Column::new(self.name, sql_type).nullable(self.is_nullable.eq_ignore_ascii_case("YES"));

        if primary_key {
            column = column.primary_key();
        }

        if self.is_generated.eq_ignore_ascii_case("ALWAYS")
            && let Some(expression) = self.generation_expression
        {
            column = column.generated_as(expression, true);
        } else if let Some(default) = self.default {
            column = column.default_expr(strip_cast(&default));
        }

        column
    }
}

/// Rebuild the type-mapper vocabulary from catalog columns.
///
/// `udt_name` carries the internal spelling (`int4`, `varchar`,
/// `timestamptz`); length, precision, and scale are reattached so the
/// result compares equal to what the mapper emits.
fn render_type(
    data_type: &str,
    udt_name: &str,
    max_length: Option<i32>,
    precision: Option<i32>,
    scale: Option<i32>,
) -> String {
    match udt_name.to_lowercase().as_str() {
        "int2" => "SMALLINT".to_string(),
        "int4" => "INTEGER".to_string(),
        "int8" => "BIGINT".to_string(),
        "float4" => "REAL".to_string(),
        "float8" => "DOUBLE PRECISION".to_string(),
        "numeric" => match (precision, scale) {
            (Some(p), Some(s)) => format!("NUMERIC({p},{s})"),
            _ => "NUMERIC".to_string(),
        },
        "bool" => "BOOLEAN".to_string(),
        "varchar" => match max_length {
            Some(n) => format!("VARCHAR({n})"),
            None => "VARCHAR".to_string(),
        },
        "bpchar" => match max_length {
            Some(n) => format!("CHAR({n})"),
            None => "CHAR".to_string(),
        },
        "text" => "TEXT".to_string(),
        "timestamptz" => "TIMESTAMPTZ".to_string(),
        "timestamp" => "TIMESTAMP".to_string(),
        "date" => "DATE".to_string(),
        "jsonb" => "JSONB".to_string(),
        "json" => "JSON".to_string(),
        "uuid" => "UUID".to_string(),
        "bytea" => "BYTEA".to_string(),
        // Enums and other user-defined types keep their catalog name.
        _ if data_type.eq_ignore_ascii_case("USER-DEFINED") => udt_name.to_string(),
        other => other.to_uppercase(),
    }
}

/// Strip a trailing `::type` cast from a catalog default expression.
///
/// Postgres stores `DEFAULT 'draft'` as `'draft'::character varying`; the
/// mapper side never writes the cast. Casts nested inside parentheses,
/// `nextval('seq'::regclass)` for one, are left alone.
fn strip_cast(default: &str) -> String {
    let bytes = default.as_bytes();
    let mut in_literal = false;
    let mut depth = 0usize;
    for i in 0..bytes.len() {
        match bytes[i] {
            b'\'' => in_literal = !in_literal,
            b'(' if !in_literal => depth += 1,
            b')' if !in_literal => depth = depth.saturating_sub(1),
            b':' if !in_literal && depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                return default[..i].to_string();
            }
            _ => {}
        }
    }
    default.to_string()
}

/// Column names referenced by one index element, as printed by
/// `pg_get_indexdef`.
///
/// Plain elements are a single identifier. Expression elements, the
/// fulltext GIN shape among them, are scanned for column references so a
/// rendered index introspects back with the columns it was declared over.
fn index_element_columns(element: &str) -> Vec<String> {
    let trimmed = element.trim();

    if let Some(ident) = quoted_ident(trimmed) {
        return vec![ident];
    }
    if is_identifier(trimmed) {
        return vec![trimmed.to_string()];
    }

    let mut columns: Vec<String> = Vec::new();
    let mut chars = trimmed.char_indices().peekable();
    while let Some((start, ch)) = chars.next() {
        match ch {
            // String literal; doubled quotes escape.
            '\'' => {
                while let Some((_, c)) = chars.next() {
                    if c == '\'' {
                        if chars.peek().is_some_and(|&(_, n)| n == '\'') {
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
            }
            // Quoted identifier; doubled quotes escape.
            '"' => {
                let mut ident = String::new();
                while let Some((_, c)) = chars.next() {
                    if c == '"' {
                        if chars.peek().is_some_and(|&(_, n)| n == '"') {
                            ident.push('"');
                            chars.next();
                        } else {
                            break;
                        }
                    } else {
                        ident.push(c);
                    }
                }
                push_unique(&mut columns, ident);
            }
            // Cast target; swallow the possibly multi-word type name.
            ':' if chars.peek().is_some_and(|&(_, n)| n == ':') => {
                chars.next();
                while chars
                    .peek()
                    .is_some_and(|&(_, n)| n.is_ascii_alphanumeric() || n == '_' || n == ' ')
                {
                    chars.next();
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut end = start + c.len_utf8();
                while let Some(&(j, next)) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        chars.next();
                        end = j + next.len_utf8();
                    } else {
                        break;
                    }
                }
                // A word directly followed by '(' is a function name.
                if trimmed[end..].trim_start().starts_with('(') {
                    continue;
                }
                push_unique(&mut columns, trimmed[start..end].to_string());
            }
            _ => {}
        }
    }
    columns
}

fn push_unique(columns: &mut Vec<String>, column: String) {
    if !column.is_empty() && !columns.contains(&column) {
        columns.push(column);
    }
}

fn quoted_ident(s: &str) -> Option<String> {
    let inner = s.strip_prefix('"')?.strip_suffix('"')?;
    // A lone quoted token only; `"a" || "b"` falls through to the scanner.
    if inner.is_empty() || inner.contains('"') {
        return None;
    }
    Some(inner.to_string())
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn index_kind(is_unique: bool, method: &str) -> IndexKind {
    if method.eq_ignore_ascii_case("gin") {
        IndexKind::Fulltext
    } else if is_unique {
        IndexKind::Unique
    } else {
        IndexKind::Index
    }
}
