//! In-memory driver backing the crate's unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use indexmap::IndexMap;
use remodel_schema::{Column, ForeignKey, Index, ScalarType, Schema, TypeMapper};

use crate::driver::{Driver, SqlDialect};
use crate::error::{MigrateResult, MigrationError};
use crate::op::{MigrationOp, OpKind};

/// A driver over a fixed in-memory schema. Rendered statements are the op
/// identifiers, so tests can assert execution order directly.
pub(crate) struct MemoryDriver {
    database: String,
    schema: Schema,
    executed: Arc<Mutex<Vec<String>>>,
    fail_on: Option<String>,
}

impl MemoryDriver {
    pub fn new(schema: Schema) -> Self {
        Self {
            database: "memory_test".to_string(),
            schema,
            executed: Arc::new(Mutex::new(Vec::new())),
            fail_on: None,
        }
    }

    /// Fail any executed statement containing the marker.
    pub fn failing_on(mut self, marker: impl Into<String>) -> Self {
        self.fail_on = Some(marker.into());
        self
    }

    /// Handle onto the executed-statement log, usable after the driver is
    /// boxed away into an engine.
    pub fn log_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.executed)
    }
}

impl TypeMapper for MemoryDriver {
    fn column_type(&self, scalar: ScalarType, field_name: &str) -> String {
        if field_name == "created_at" || field_name == "updated_at" {
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

impl SqlDialect for MemoryDriver {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("`{ident}`")
    }

    fn render(&self, op: &MigrationOp) -> Vec<String> {
        // modifyColumn renders two statements to exercise flattening.
        match &op.kind {
            OpKind::ModifyColumn { .. } => vec![
                format!("{}#1", op.identifier()),
                format!("{}#2", op.identifier()),
            ],
            _ => vec![op.identifier()],
        }
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    async fn database_name(&self) -> MigrateResult<String> {
        Ok(self.database.clone())
    }

    async fn tables(&self, _database: &str) -> MigrateResult<Vec<String>> {
        let mut names: Vec<String> = self.schema.tables.keys().cloned().collect();
        names.sort_unstable();
        Ok(names)
    }

    async fn columns(
        &self,
        _database: &str,
        table: &str,
    ) -> MigrateResult<IndexMap<String, Column>> {
        Ok(self
            .schema
            .get_table(table)
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }

    async fn indexes(
        &self,
        _database: &str,
        table: &str,
    ) -> MigrateResult<IndexMap<String, Index>> {
        Ok(self
            .schema
            .get_table(table)
            .map(|t| t.indexes.clone())
            .unwrap_or_default())
    }

    async fn foreign_keys(
        &self,
        _database: &str,
        table: &str,
    ) -> MigrateResult<IndexMap<String, ForeignKey>> {
        Ok(self
            .schema
            .get_table(table)
            .map(|t| t.foreign_keys.clone())
            .unwrap_or_default())
    }

    async fn execute(&self, statement: &str) -> MigrateResult<u64> {
        if let Some(marker) = &self.fail_on
            && statement.contains(marker.as_str())
        {
            return Err(MigrationError::database(format!(
                "forced failure at `{statement}`"
            )));
        }
        self.executed.lock().unwrap().push(statement.to_string());
        Ok(0)
    }
}
