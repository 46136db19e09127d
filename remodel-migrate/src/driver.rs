//! Database driver abstraction and the dialect registry.
//!
//! One object per database product implements the whole stack:
//! [`TypeMapper`] (scalar → native column types, consumed by the extractor),
//! [`SqlDialect`] (DDL rendering), and [`Driver`] (async introspection
//! queries and statement execution). The engine receives the driver
//! explicitly; nothing global.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use indexmap::IndexMap;
use remodel_schema::{Column, ForeignKey, Index, TypeMapper};
use url::Url;

use crate::error::{MigrateResult, MigrationError};
use crate::op::MigrationOp;

/// Renders plan operations as dialect-specific DDL.
pub trait SqlDialect: TypeMapper {
    /// Dialect identifier, e.g. `mysql`.
    fn name(&self) -> &'static str;

    /// Quote an identifier for this dialect.
    fn quote_ident(&self, ident: &str) -> String;

    /// Render one operation into one or more SQL statements.
    fn render(&self, op: &MigrationOp) -> Vec<String>;
}

/// A connected database driver.
///
/// Introspection methods take the database name explicitly because the
/// catalog queries are scoped to it; [`Driver::database_name`] reports the
/// database the connection points at.
#[async_trait]
pub trait Driver: SqlDialect + Send + Sync {
    /// The database the connection is using.
    async fn database_name(&self) -> MigrateResult<String>;

    /// Base-table names in the database, sorted.
    async fn tables(&self, database: &str) -> MigrateResult<Vec<String>>;

    /// Columns of one table, in ordinal order.
    async fn columns(&self, database: &str, table: &str)
    -> MigrateResult<IndexMap<String, Column>>;

    /// Indexes of one table, keyed by index name, as reported by the
    /// catalog (including primary-key and constraint-backing entries).
    async fn indexes(&self, database: &str, table: &str) -> MigrateResult<IndexMap<String, Index>>;

    /// Foreign keys of one table, keyed by constraint name.
    async fn foreign_keys(
        &self,
        database: &str,
        table: &str,
    ) -> MigrateResult<IndexMap<String, ForeignKey>>;

    /// Execute a single DDL statement, returning the affected-row count.
    async fn execute(&self, statement: &str) -> MigrateResult<u64>;
}

/// A boxed future resolving to a connected driver.
pub type DriverFuture = Pin<Box<dyn Future<Output = MigrateResult<Box<dyn Driver>>> + Send>>;

/// A connector: takes a database URL, yields a connected driver.
pub type Connector = Box<dyn Fn(&str) -> DriverFuture + Send + Sync>;

/// Maps dialect identifiers to connectors.
///
/// Populated once at startup; resolution happens either by explicit dialect
/// name or by the URL scheme.
#[derive(Default)]
pub struct DriverRegistry {
    connectors: HashMap<String, Connector>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connector under a dialect identifier.
    pub fn register<F, Fut>(&mut self, dialect: impl Into<String>, connector: F)
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = MigrateResult<Box<dyn Driver>>> + Send + 'static,
    {
        let boxed: Connector = Box::new(move |url: &str| Box::pin(connector(url.to_string())));
        self.connectors.insert(dialect.into().to_lowercase(), boxed);
    }

    /// Registered dialect identifiers, sorted.
    pub fn dialects(&self) -> Vec<&str> {
        let mut dialects: Vec<&str> = self.connectors.keys().map(String::as_str).collect();
        dialects.sort_unstable();
        dialects
    }

    /// Whether a dialect is registered.
    pub fn contains(&self, dialect: &str) -> bool {
        self.connectors.contains_key(&dialect.to_lowercase())
    }

    /// Connect using an explicit dialect identifier.
    pub async fn connect_with(&self, dialect: &str, url: &str) -> MigrateResult<Box<dyn Driver>> {
        let connector = self
            .connectors
            .get(&dialect.to_lowercase())
            .ok_or_else(|| MigrationError::unsupported_dialect(dialect, &self.dialects()))?;
        connector(url).await
    }

    /// Connect by resolving the dialect from the URL scheme.
    pub async fn connect(&self, url: &str) -> MigrateResult<Box<dyn Driver>> {
        let parsed = Url::parse(url)
            .map_err(|e| MigrationError::invalid_url(format!("{url}: {e}")))?;
        self.connect_with(parsed.scheme(), url).await
    }
}
