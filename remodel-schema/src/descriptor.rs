//! Model descriptors: the declarative source of the desired schema.
//!
//! A [`ModelDescriptor`] enumerates one application model's fields, its
//! belongs-to references, and its hints (index kinds per column, column
//! attribute overrides). Descriptors are plain serde values, so they can be
//! built in code during startup registration or loaded from a directory of
//! TOML declaration files:
//!
//! ```toml
//! name = "Post"
//! table = "blog_posts"          # optional override
//!
//! [[fields]]
//! name = "id"
//! type = "uuid"
//!
//! [[fields]]
//! name = "title"
//! type = "string"
//!
//! [[fields]]
//! name = "author"
//! references = "User"           # belongs-to; becomes author_id + FK
//!
//! [indexes]
//! title = "index"
//!
//! [overrides.title]
//! type = "VARCHAR(500)"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SchemaError, SchemaResult};
use crate::schema::IndexKind;

/// File extension recognized when scanning a models directory.
pub const DESCRIPTOR_EXTENSION: &str = "toml";

// ============================================================================
// Scalar Types
// ============================================================================

/// The closed set of scalar field types a model may declare.
///
/// Dialect drivers map these to native column types; see
/// [`TypeMapper`](crate::extract::TypeMapper).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Int,
    BigInt,
    Float,
    Decimal,
    Boolean,
    String,
    Text,
    DateTime,
    Date,
    Json,
    Uuid,
    Bytes,
}

impl ScalarType {
    /// The lowercase name used in descriptor files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::BigInt => "bigint",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Text => "text",
            Self::DateTime => "datetime",
            Self::Date => "date",
            Self::Json => "json",
            Self::Uuid => "uuid",
            Self::Bytes => "bytes",
        }
    }
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Field Descriptors
// ============================================================================

/// One declared model field.
///
/// A field is either scalar (`type = "..."`) or a belongs-to reference
/// (`references = "Model"`). A field with neither is untyped; extraction
/// skips it with a warning instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name as declared on the model.
    pub name: String,
    /// Scalar type, for plain columns.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub scalar: Option<ScalarType>,
    /// Referenced model name, for belongs-to fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
    /// Whether the resulting column accepts NULL.
    #[serde(default)]
    pub nullable: bool,
}

impl FieldDescriptor {
    /// Declare a scalar field.
    pub fn scalar(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self {
            name: name.into(),
            scalar: Some(scalar),
            references: None,
            nullable: false,
        }
    }

    /// Declare a belongs-to reference field.
    pub fn reference(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scalar: None,
            references: Some(model.into()),
            nullable: false,
        }
    }

    /// Mark the field nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Whether the field declares any usable type.
    pub fn is_typed(&self) -> bool {
        self.scalar.is_some() || self.references.is_some()
    }
}

/// Column attribute overrides applied after base inference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnOverride {
    /// Replacement dialect type expression.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub sql_type: Option<String>,
    /// Replacement nullability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    /// Replacement default expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl ColumnOverride {
    /// Override the column type.
    pub fn sql_type(mut self, sql_type: impl Into<String>) -> Self {
        self.sql_type = Some(sql_type.into());
        self
    }

    /// Override nullability.
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    /// Override the default expression.
    pub fn default_expr(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

// ============================================================================
// Model Descriptors
// ============================================================================

/// A full model declaration: fields plus hints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Model type name in PascalCase, e.g. `BlogPost`.
    pub name: String,
    /// Explicit table name, overriding the derived one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Declared fields in order.
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    /// Index hints: column name → index kind.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub indexes: BTreeMap<String, IndexKind>,
    /// Column overrides: column name → attribute overrides.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<String, ColumnOverride>,
}

impl ModelDescriptor {
    /// Create an empty descriptor for the given model name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set an explicit table name.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Append a field.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Hint a plain index on a column.
    pub fn index(mut self, column: impl Into<String>) -> Self {
        self.indexes.insert(column.into(), IndexKind::Index);
        self
    }

    /// Hint a unique index on a column.
    pub fn unique(mut self, column: impl Into<String>) -> Self {
        self.indexes.insert(column.into(), IndexKind::Unique);
        self
    }

    /// Hint a full-text index on a column.
    pub fn fulltext(mut self, column: impl Into<String>) -> Self {
        self.indexes.insert(column.into(), IndexKind::Fulltext);
        self
    }

    /// Attach a column override.
    pub fn override_column(
        mut self,
        column: impl Into<String>,
        override_: ColumnOverride,
    ) -> Self {
        self.overrides.insert(column.into(), override_);
        self
    }

    /// The field acting as primary key: `id` by convention.
    pub fn primary_key_field(&self) -> &str {
        self.fields
            .iter()
            .map(|f| f.name.as_str())
            .find(|name| *name == "id")
            .unwrap_or("id")
    }

    /// Parse a descriptor from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

// ============================================================================
// Model Registry
// ============================================================================

/// The set of declared models, keyed by model name.
///
/// Registration order is preserved; when loading from a directory, files are
/// visited in sorted name order so repeated runs see the same sequence.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelDescriptor>,
}

impl ModelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. Fails on an empty model name or a duplicate.
    pub fn register(&mut self, model: ModelDescriptor) -> SchemaResult<()> {
        if model.name.is_empty() {
            return Err(SchemaError::invalid_model(
                "<unnamed>",
                "model name must not be empty",
            ));
        }
        if self.models.contains_key(&model.name) {
            return Err(SchemaError::duplicate("model", &model.name));
        }
        debug!(model = %model.name, fields = model.fields.len(), "Registered model");
        self.models.insert(model.name.clone(), model);
        Ok(())
    }

    /// Look up a descriptor by model name.
    pub fn get(&self, name: &str) -> Option<&ModelDescriptor> {
        self.models.get(name)
    }

    /// Whether a model with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Registered descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.values()
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Load every `*.toml` descriptor in a directory into a new registry.
    pub fn load_dir(dir: impl AsRef<Path>) -> SchemaResult<Self> {
        let dir = dir.as_ref();
        let entries =
            std::fs::read_dir(dir).map_err(|e| SchemaError::io(dir.display().to_string(), e))?;

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(DESCRIPTOR_EXTENSION))
            })
            .collect();
        paths.sort();

        let mut registry = Self::new();
        for path in paths {
            registry.register(Self::load_file(&path)?)?;
        }
        debug!(dir = %dir.display(), models = registry.len(), "Loaded model directory");
        Ok(registry)
    }

    /// Load a single descriptor file.
    pub fn load_file(path: impl AsRef<Path>) -> SchemaResult<ModelDescriptor> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SchemaError::io(path.display().to_string(), e))?;
        ModelDescriptor::from_toml(&text)
            .map_err(|e| SchemaError::descriptor(path.display().to_string(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POST_TOML: &str = r#"
        name = "Post"
        table = "blog_posts"

        [[fields]]
        name = "id"
        type = "uuid"

        [[fields]]
        name = "title"
        type = "string"

        [[fields]]
        name = "summary"
        type = "text"
        nullable = true

        [[fields]]
        name = "author"
        references = "User"

        [indexes]
        title = "index"
        slug = "unique"

        [overrides.title]
        type = "VARCHAR(500)"
    "#;

    // ==================== Descriptor Parsing Tests ====================

    #[test]
    fn test_parse_descriptor_toml() {
        let model = ModelDescriptor::from_toml(POST_TOML).expect("descriptor should parse");
        assert_eq!(model.name, "Post");
        assert_eq!(model.table.as_deref(), Some("blog_posts"));
        assert_eq!(model.fields.len(), 4);

        let summary = &model.fields[2];
        assert_eq!(summary.scalar, Some(ScalarType::Text));
        assert!(summary.nullable);

        let author = &model.fields[3];
        assert_eq!(author.references.as_deref(), Some("User"));
        assert!(author.scalar.is_none());

        assert_eq!(model.indexes.get("title"), Some(&IndexKind::Index));
        assert_eq!(model.indexes.get("slug"), Some(&IndexKind::Unique));
        assert_eq!(
            model.overrides.get("title").and_then(|o| o.sql_type.as_deref()),
            Some("VARCHAR(500)")
        );
    }

    #[test]
    fn test_untyped_field_parses() {
        let model = ModelDescriptor::from_toml(
            r#"
            name = "Draft"

            [[fields]]
            name = "mystery"
            "#,
        )
        .unwrap();
        assert!(!model.fields[0].is_typed());
    }

    #[test]
    fn test_scalar_type_names_roundtrip() {
        for scalar in [
            ScalarType::Int,
            ScalarType::BigInt,
            ScalarType::Float,
            ScalarType::Decimal,
            ScalarType::Boolean,
            ScalarType::String,
            ScalarType::Text,
            ScalarType::DateTime,
            ScalarType::Date,
            ScalarType::Json,
            ScalarType::Uuid,
            ScalarType::Bytes,
        ] {
            let toml = format!("name = \"f\"\ntype = \"{}\"", scalar.name());
            let field: FieldDescriptor = toml::from_str(&toml).unwrap();
            assert_eq!(field.scalar, Some(scalar));
        }
    }

    // ==================== Builder Tests ====================

    #[test]
    fn test_builder_mirrors_toml() {
        let built = ModelDescriptor::new("Post")
            .table("blog_posts")
            .field(FieldDescriptor::scalar("id", ScalarType::Uuid))
            .field(FieldDescriptor::scalar("title", ScalarType::String))
            .field(FieldDescriptor::scalar("summary", ScalarType::Text).nullable())
            .field(FieldDescriptor::reference("author", "User"))
            .index("title")
            .unique("slug")
            .override_column("title", ColumnOverride::default().sql_type("VARCHAR(500)"));

        let parsed = ModelDescriptor::from_toml(POST_TOML).unwrap();
        assert_eq!(built, parsed);
    }

    #[test]
    fn test_primary_key_field_defaults_to_id() {
        let with_id = ModelDescriptor::new("User")
            .field(FieldDescriptor::scalar("id", ScalarType::Uuid));
        assert_eq!(with_id.primary_key_field(), "id");

        let without = ModelDescriptor::new("Odd")
            .field(FieldDescriptor::scalar("label", ScalarType::String));
        assert_eq!(without.primary_key_field(), "id");
    }

    // ==================== Registry Tests ====================

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = ModelRegistry::new();
        registry.register(ModelDescriptor::new("User")).unwrap();
        let err = registry.register(ModelDescriptor::new("User")).unwrap_err();
        assert!(err.to_string().contains("duplicate model"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_rejects_empty_name() {
        let mut registry = ModelRegistry::new();
        assert!(registry.register(ModelDescriptor::default()).is_err());
    }

    #[test]
    fn test_load_dir_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("user.toml"),
            "name = \"User\"\n[[fields]]\nname = \"id\"\ntype = \"uuid\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("post.toml"),
            "name = \"Post\"\n[[fields]]\nname = \"id\"\ntype = \"uuid\"\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let registry = ModelRegistry::load_dir(dir.path()).unwrap();
        assert_eq!(registry.len(), 2);
        // post.toml sorts before user.toml
        let names: Vec<&str> = registry.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Post", "User"]);
    }

    #[test]
    fn test_load_dir_missing_directory_fails() {
        let err = ModelRegistry::load_dir("/definitely/not/here").unwrap_err();
        assert!(matches!(err, SchemaError::Io { .. }));
    }

    #[test]
    fn test_load_file_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "name = [this is not toml").unwrap();
        let err = ModelRegistry::load_file(&path).unwrap_err();
        assert!(matches!(err, SchemaError::Descriptor { .. }));
    }
}
