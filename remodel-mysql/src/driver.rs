//! MySQL driver: pooled connections, catalog queries, and DDL execution.

use async_trait::async_trait;
use indexmap::IndexMap;
use mysql_async::prelude::*;
use mysql_async::{Conn, Pool};
use remodel_migrate::{
    Driver, DriverRegistry, MigrateResult, MigrationError, MigrationOp, SqlDialect,
};
use remodel_schema::{
    Column, ForeignKey, Index, IndexKind, ReferentialAction, ScalarType, TypeMapper,
};
use tracing::{debug, info};

use crate::config::MySqlConfig;
use crate::dialect::MySqlDialect;

mod queries {
    pub const TABLES: &str = "\
        SELECT table_name \
        FROM information_schema.tables \
        WHERE table_schema = ? AND table_type = 'BASE TABLE' \
        ORDER BY table_name";

    pub const COLUMNS: &str = "\
        SELECT column_name, column_type, is_nullable, column_default, \
               column_key, extra, generation_expression \
        FROM information_schema.columns \
        WHERE table_schema = ? AND table_name = ? \
        ORDER BY ordinal_position";

    pub const INDEXES: &str = "\
        SELECT index_name, column_name, non_unique, index_type \
        FROM information_schema.statistics \
        WHERE table_schema = ? AND table_name = ? \
        ORDER BY index_name, seq_in_index";

    pub const FOREIGN_KEYS: &str = "\
        SELECT kcu.constraint_name, kcu.column_name, \
               kcu.referenced_table_name, kcu.referenced_column_name, \
               rc.delete_rule, rc.update_rule \
        FROM information_schema.key_column_usage kcu \
        JOIN information_schema.referential_constraints rc \
          ON rc.constraint_schema = kcu.constraint_schema \
         AND rc.constraint_name = kcu.constraint_name \
        WHERE kcu.table_schema = ? AND kcu.table_name = ? \
          AND kcu.referenced_table_name IS NOT NULL \
        ORDER BY kcu.constraint_name, kcu.ordinal_position";
}

/// A MySQL (or MariaDB) migration driver backed by a connection pool.
pub struct MySqlDriver {
    pool: Pool,
    database: String,
}

impl MySqlDriver {
    /// Connect using a `mysql://` URL.
    pub async fn connect(url: &str) -> MigrateResult<Self> {
        Self::with_config(MySqlConfig::from_url(url)?).await
    }

    /// Connect using an explicit configuration.
    pub async fn with_config(config: MySqlConfig) -> MigrateResult<Self> {
        let database = config.database.clone();
        let pool = Pool::new(config.to_opts());

        // Round-trip once so bad credentials surface here rather than on
        // the first catalog query.
        let mut conn = pool
            .get_conn()
            .await
            .map_err(|e| MigrationError::connection(e.to_string()))?;
        conn.query_drop("SELECT 1")
            .await
            .map_err(|e| MigrationError::connection(e.to_string()))?;

        info!(database = %database, "Connected to MySQL");
        Ok(Self { pool, database })
    }

    /// Close the pool, waiting for in-flight connections.
    pub async fn disconnect(self) -> MigrateResult<()> {
        self.pool
            .disconnect()
            .await
            .map_err(|e| MigrationError::connection(e.to_string()))
    }

    async fn conn(&self) -> MigrateResult<Conn> {
        self.pool
            .get_conn()
            .await
            .map_err(|e| MigrationError::connection(e.to_string()))
    }
}

impl TypeMapper for MySqlDriver {
    fn column_type(&self, scalar: ScalarType, field_name: &str) -> String {
        MySqlDialect.column_type(scalar, field_name)
    }

    fn timestamp_default(&self, field_name: &str) -> Option<String> {
        MySqlDialect.timestamp_default(field_name)
    }
}

impl SqlDialect for MySqlDriver {
    fn name(&self) -> &'static str {
        MySqlDialect.name()
    }

    fn quote_ident(&self, ident: &str) -> String {
        MySqlDialect.quote_ident(ident)
    }

    fn render(&self, op: &MigrationOp) -> Vec<String> {
        MySqlDialect.render(op)
    }
}

#[async_trait]
impl Driver for MySqlDriver {
    async fn database_name(&self) -> MigrateResult<String> {
        Ok(self.database.clone())
    }

    async fn tables(&self, database: &str) -> MigrateResult<Vec<String>> {
        let mut conn = self.conn().await?;
        debug!(database = %database, "Listing tables");
        let tables: Vec<String> = conn
            .exec(queries::TABLES, (database,))
            .await
            .map_err(|e| MigrationError::database(e.to_string()))?;
        Ok(tables)
    }

    async fn columns(
        &self,
        database: &str,
        table: &str,
    ) -> MigrateResult<IndexMap<String, Column>> {
        let mut conn = self.conn().await?;
        debug!(database = %database, table = %table, "Introspecting columns");
        let rows: Vec<(String, String, String, Option<String>, String, String, Option<String>)> =
            conn.exec(queries::COLUMNS, (database, table))
                .await
                .map_err(|e| MigrationError::database(e.to_string()))?;

        let mut columns = IndexMap::new();
        for (name, column_type, is_nullable, default, key, extra, generation_expression) in rows {
            let row = ColumnRow {
                name,
                column_type,
                is_nullable,
                default,
                key,
                extra,
                generation_expression,
            };
            let column = row.into_column();
            columns.insert(column.name.clone(), column);
        }
        Ok(columns)
    }

    async fn indexes(&self, database: &str, table: &str) -> MigrateResult<IndexMap<String, Index>> {
        let mut conn = self.conn().await?;
        debug!(database = %database, table = %table, "Introspecting indexes");
        let rows: Vec<(String, String, i64, String)> = conn
            .exec(queries::INDEXES, (database, table))
            .await
            .map_err(|e| MigrationError::database(e.to_string()))?;

        let mut indexes: IndexMap<String, Index> = IndexMap::new();
        for (name, column, non_unique, index_type) in rows {
            let kind = index_kind(non_unique, &index_type);
            indexes
                .entry(name.clone())
                .or_insert_with(|| Index::new(name, Vec::<String>::new(), kind))
                .columns
                .push(column);
        }
        Ok(indexes)
    }

    async fn foreign_keys(
        &self,
        database: &str,
        table: &str,
    ) -> MigrateResult<IndexMap<String, ForeignKey>> {
        let mut conn = self.conn().await?;
        debug!(database = %database, table = %table, "Introspecting foreign keys");
        let rows: Vec<(String, String, String, String, String, String)> = conn
            .exec(queries::FOREIGN_KEYS, (database, table))
            .await
            .map_err(|e| MigrationError::database(e.to_string()))?;

        let mut foreign_keys: IndexMap<String, ForeignKey> = IndexMap::new();
        for (name, column, referenced_table, referenced_column, delete_rule, update_rule) in rows {
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
        let mut conn = self.conn().await?;
        debug!(statement = %statement, "Executing statement");
        conn.query_drop(statement)
            .await
            .map_err(|e| MigrationError::database(e.to_string()))?;
        Ok(conn.affected_rows())
    }
}

/// Register the MySQL connector under the `mysql` and `mariadb` schemes.
pub fn register(registry: &mut DriverRegistry) {
    for scheme in ["mysql", "mariadb"] {
        registry.register(scheme, |url: String| async move {
            Ok(Box::new(MySqlDriver::connect(&url).await?) as Box<dyn Driver>)
        });
    }
}

/// One row of `information_schema.columns`, in catalog vocabulary.
struct ColumnRow {
    name: String,
    column_type: String,
    is_nullable: String,
    default: Option<String>,
    key: String,
    extra: String,
    generation_expression: Option<String>,
}

impl ColumnRow {
    fn into_column(self) -> Column {
        let mut column = Column::new(self.name, normalize_type(&self.column_type))
            .nullable(self.is_nullable.eq_ignore_ascii_case("YES"));

        if self.key == "PRI" {
            column = column.primary_key();
        }

        // MySQL reports an empty generation expression for plain columns;
        // MariaDB reports NULL.
        let expression = self.generation_expression.filter(|e| !e.is_empty());
        if let Some(expression) = expression {
            let stored = self.extra.to_ascii_uppercase().contains("STORED");
            column = column.generated_as(expression, stored);
        } else if let Some(mut default) = self.default {
            // The ON UPDATE clause lives in `extra`; fold it back into the
            // default so live columns compare equal to mapped ones.
            if self
                .extra
                .to_ascii_uppercase()
                .contains("ON UPDATE CURRENT_TIMESTAMP")
            {
                default.push_str(" ON UPDATE CURRENT_TIMESTAMP");
            }
            column = column.default_expr(default);
        }

        column
    }
}

/// Uppercase a catalog type string outside single-quoted literals.
///
/// `information_schema` reports column types in lowercase while the type
/// mapper emits uppercase. Enum and set values keep their case so value
/// edits still show up in the diff.
fn normalize_type(raw: &str) -> String {
    let mut normalized = String::with_capacity(raw.len());
    let mut in_literal = false;
    for ch in raw.chars() {
        if ch == '\'' {
            in_literal = !in_literal;
        }
        if in_literal {
            normalized.push(ch);
        } else {
            normalized.extend(ch.to_uppercase());
        }
    }
    normalized
}

fn index_kind(non_unique: i64, index_type: &str) -> IndexKind {
    if index_type.eq_ignore_ascii_case("FULLTEXT") {
        IndexKind::Fulltext
    } else if non_unique == 0 {
        IndexKind::Unique
    } else {
        IndexKind::Index
    }
}
