//! Value types describing a relational schema.
//!
//! These are the shared vocabulary of the whole engine: the extractor builds
//! a [`Schema`] describing what the database *should* look like, the
//! introspector builds one describing what it *does* look like, and the diff
//! engine compares the two. The types are plain data with serde support and
//! equality-relevant accessors; they carry no policy of their own.
//!
//! Tables keep their columns in declaration order (`IndexMap`) so rendered
//! `CREATE TABLE` statements read the way the model was written. Nothing may
//! rely on that order semantically; the differ visits names in sorted order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ============================================================================
// Referential Actions
// ============================================================================

/// Action taken on a foreign key when the referenced row changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferentialAction {
    /// Reject the change while referencing rows exist.
    #[serde(rename = "RESTRICT")]
    Restrict,
    /// Propagate the change to referencing rows.
    #[serde(rename = "CASCADE")]
    Cascade,
    /// Null out the referencing column.
    #[serde(rename = "SET NULL")]
    SetNull,
    /// Reset the referencing column to its default.
    #[serde(rename = "SET DEFAULT")]
    SetDefault,
    /// Defer to the database's default behavior.
    #[serde(rename = "NO ACTION")]
    NoAction,
}

impl ReferentialAction {
    /// The SQL keyword for this action.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::NoAction => "NO ACTION",
        }
    }

    /// Parse a rule string as reported by information-schema queries.
    ///
    /// Unknown strings map to `NO ACTION` rather than failing: introspection
    /// must keep going even when a dialect reports a rule we do not model.
    pub fn from_sql(rule: &str) -> Self {
        match rule.trim().to_uppercase().as_str() {
            "RESTRICT" => Self::Restrict,
            "CASCADE" => Self::Cascade,
            "SET NULL" | "SET_NULL" => Self::SetNull,
            "SET DEFAULT" | "SET_DEFAULT" => Self::SetDefault,
            _ => Self::NoAction,
        }
    }
}

impl std::fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

fn default_on_delete() -> ReferentialAction {
    ReferentialAction::Restrict
}

fn default_on_update() -> ReferentialAction {
    ReferentialAction::Cascade
}

// ============================================================================
// Column
// ============================================================================

/// A single table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Dialect-native type expression, e.g. `VARCHAR(255)`.
    pub sql_type: String,
    /// Whether NULL values are accepted.
    #[serde(default)]
    pub nullable: bool,
    /// Raw SQL default expression or literal, rendered verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Whether this column is (part of) the primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Generation expression for computed columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<String>,
    /// Whether a generated column is persisted rather than virtual.
    #[serde(default)]
    pub stored: bool,
}

impl Column {
    /// Create a non-nullable column with the given type expression.
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            nullable: false,
            default: None,
            primary_key: false,
            generated: None,
            stored: false,
        }
    }

    /// Set nullability.
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Set the default expression.
    pub fn default_expr(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Mark the column as the primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Set a generation expression; `stored` controls persistence.
    pub fn generated_as(mut self, expression: impl Into<String>, stored: bool) -> Self {
        self.generated = Some(expression.into());
        self.stored = stored;
        self
    }

    /// Whether two columns differ in any attribute the diff engine compares:
    /// type, nullability, default, or primary-key membership.
    pub fn definition_differs(&self, other: &Column) -> bool {
        self.sql_type != other.sql_type
            || self.nullable != other.nullable
            || self.default != other.default
            || self.primary_key != other.primary_key
    }
}

// ============================================================================
// Index
// ============================================================================

/// The kind of an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Plain secondary index.
    #[default]
    Index,
    /// Unique constraint index.
    Unique,
    /// Full-text search index.
    Fulltext,
}

/// A named index over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Index name, unique within its table.
    pub name: String,
    /// Ordered column list; more than one entry for composite indexes.
    pub columns: Vec<String>,
    /// Index kind.
    #[serde(default)]
    pub kind: IndexKind,
}

impl Index {
    /// Create an index over the given columns.
    pub fn new<I, S>(name: impl Into<String>, columns: I, kind: IndexKind) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            kind,
        }
    }

    /// Whether another index covers the same columns in the same order with
    /// the same kind. Names are compared by the map key, not here.
    pub fn matches(&self, other: &Index) -> bool {
        self.columns == other.columns && self.kind == other.kind
    }
}

// ============================================================================
// Foreign Key
// ============================================================================

/// A single-column foreign-key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name, unique within its table.
    pub name: String,
    /// The owning table's column.
    pub column: String,
    /// Referenced table name.
    pub referenced_table: String,
    /// Referenced column name.
    pub referenced_column: String,
    /// Action on referenced-row deletion.
    #[serde(default = "default_on_delete")]
    pub on_delete: ReferentialAction,
    /// Action on referenced-key update.
    #[serde(default = "default_on_update")]
    pub on_update: ReferentialAction,
}

impl ForeignKey {
    /// Create a foreign key with the default `RESTRICT`/`CASCADE` actions.
    pub fn new(
        name: impl Into<String>,
        column: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            referenced_table: referenced_table.into(),
            referenced_column: referenced_column.into(),
            on_delete: default_on_delete(),
            on_update: default_on_update(),
        }
    }

    /// Set the on-delete action.
    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = action;
        self
    }

    /// Set the on-update action.
    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = action;
        self
    }

    /// Whether another constraint has the same column, target, and actions.
    pub fn matches(&self, other: &ForeignKey) -> bool {
        self.column == other.column
            && self.referenced_table == other.referenced_table
            && self.referenced_column == other.referenced_column
            && self.on_delete == other.on_delete
            && self.on_update == other.on_update
    }
}

// ============================================================================
// Table
// ============================================================================

/// A table: columns, indexes, and foreign keys, each keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Columns keyed by column name, in declaration order.
    #[serde(default)]
    pub columns: IndexMap<String, Column>,
    /// Indexes keyed by index name.
    #[serde(default)]
    pub indexes: IndexMap<String, Index>,
    /// Foreign keys keyed by constraint name.
    #[serde(default)]
    pub foreign_keys: IndexMap<String, ForeignKey>,
}

impl Table {
    /// Create an empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Insert a column, keyed by its name.
    pub fn add_column(&mut self, column: Column) {
        self.columns.insert(column.name.clone(), column);
    }

    /// Insert an index, keyed by its name.
    pub fn add_index(&mut self, index: Index) {
        self.indexes.insert(index.name.clone(), index);
    }

    /// Insert a foreign key, keyed by its constraint name.
    pub fn add_foreign_key(&mut self, foreign_key: ForeignKey) {
        self.foreign_keys.insert(foreign_key.name.clone(), foreign_key);
    }

    /// Look up a column by name.
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Look up a column mutably (override application).
    pub fn get_column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.get_mut(name)
    }

    /// Look up an index by name.
    pub fn get_index(&self, name: &str) -> Option<&Index> {
        self.indexes.get(name)
    }

    /// Look up a foreign key by constraint name.
    pub fn get_foreign_key(&self, name: &str) -> Option<&ForeignKey> {
        self.foreign_keys.get(name)
    }

    /// The primary-key column, if one is marked.
    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.values().find(|c| c.primary_key)
    }
}

// ============================================================================
// Schema
// ============================================================================

/// A full schema: tables keyed by name. The unit of comparison for diffing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Tables keyed by table name.
    #[serde(default)]
    pub tables: IndexMap<String, Table>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a table, keyed by its name.
    pub fn add_table(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }

    /// Look up a table by name.
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Whether a table with this name exists.
    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether the schema holds no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Table names in sorted order, for deterministic iteration.
    pub fn sorted_table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
