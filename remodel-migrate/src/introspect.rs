//! Live-schema introspection through a dialect driver.
//!
//! The introspector is a pure adapter: it asks the driver for table,
//! column, index, and foreign-key listings and assembles them into a
//! [`Schema`] shaped like the extractor's output, so the two sides diff
//! cleanly. Catalog noise the model layer never declares (the primary-key
//! index and the indexes databases create to back foreign keys) is
//! filtered out during assembly.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use remodel_schema::{Column, ForeignKey, Index, Schema, Table};
use tracing::debug;

use crate::driver::Driver;
use crate::error::MigrateResult;

/// Options controlling an introspection pass.
#[derive(Debug, Clone, Default)]
pub struct IntrospectOptions {
    /// Tables to leave out of the snapshot entirely.
    pub exclude_tables: BTreeSet<String>,
}

impl IntrospectOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude a table from the snapshot.
    pub fn exclude(mut self, table: impl Into<String>) -> Self {
        self.exclude_tables.insert(table.into());
        self
    }

    /// Whether a table is excluded.
    pub fn is_excluded(&self, table: &str) -> bool {
        self.exclude_tables.contains(table)
    }
}

/// Builds a [`Schema`] snapshot of the live database.
pub struct Introspector<'a> {
    driver: &'a dyn Driver,
    options: IntrospectOptions,
}

impl<'a> Introspector<'a> {
    /// Create an introspector with default options.
    pub fn new(driver: &'a dyn Driver) -> Self {
        Self::with_options(driver, IntrospectOptions::new())
    }

    /// Create an introspector with the given options.
    pub fn with_options(driver: &'a dyn Driver, options: IntrospectOptions) -> Self {
        Self { driver, options }
    }

    /// Snapshot the live schema.
    pub async fn snapshot(&self) -> MigrateResult<Schema> {
        let database = self.driver.database_name().await?;
        let mut schema = Schema::new();

        for table_name in self.driver.tables(&database).await? {
            if self.options.is_excluded(&table_name) {
                debug!(table = %table_name, "Excluding table from snapshot");
                continue;
            }
            let columns = self.driver.columns(&database, &table_name).await?;
            let indexes = self.driver.indexes(&database, &table_name).await?;
            let foreign_keys = self.driver.foreign_keys(&database, &table_name).await?;
            schema.add_table(assemble_table(table_name, columns, indexes, foreign_keys));
        }

        debug!(database = %database, tables = schema.len(), "Introspected live schema");
        Ok(schema)
    }
}

/// Assemble one table from raw catalog listings.
///
/// Index entries named `PRIMARY` (MySQL), `<table>_pkey` (Postgres), or
/// sharing a foreign-key constraint name (MySQL's auto-created FK indexes)
/// are implementation detail, not declared schema, and are dropped here.
pub fn assemble_table(
    name: String,
    columns: IndexMap<String, Column>,
    indexes: IndexMap<String, Index>,
    foreign_keys: IndexMap<String, ForeignKey>,
) -> Table {
    let pkey_index = format!("{}_pkey", name);
    let mut table = Table::new(&name);
    table.columns = columns;
    for (index_name, index) in indexes {
        if index_name == "PRIMARY"
            || index_name == pkey_index
            || foreign_keys.contains_key(&index_name)
        {
            continue;
        }
        table.indexes.insert(index_name, index);
    }
    table.foreign_keys = foreign_keys;
    table
}
