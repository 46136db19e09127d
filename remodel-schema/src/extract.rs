//! Desired-schema extraction from registered model descriptors.
//!
//! Extraction is best-effort: a model that cannot be extracted (its
//! belongs-to target is not declared) is excluded with a warning and the
//! scan continues, as are untyped fields and hints naming unknown columns.
//! Callers inspect [`Extraction::warnings`] to see what was skipped.

use std::fmt;

use tracing::{debug, warn};

use crate::descriptor::{FieldDescriptor, ModelDescriptor, ModelRegistry, ScalarType};
use crate::names;
use crate::schema::{Column, ForeignKey, Index, Schema, Table};

/// Field names that receive database-side timestamp defaults.
pub const TIMESTAMP_FIELDS: [&str; 2] = ["created_at", "updated_at"];

/// Maps scalar field types to dialect-native column types.
///
/// Implemented by each dialect driver. `column_type` receives the field name
/// so dialects can special-case timestamp columns; `timestamp_default`
/// supplies the database-side default expression for `created_at` /
/// `updated_at` (including any on-update clause the dialect supports).
pub trait TypeMapper {
    /// Native column type expression for a scalar field.
    fn column_type(&self, scalar: ScalarType, field_name: &str) -> String;

    /// Default expression for a timestamp field, if the dialect has one.
    fn timestamp_default(&self, field_name: &str) -> Option<String>;
}

/// A warning collected during extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionWarning {
    /// The model the warning belongs to.
    pub model: String,
    /// The offending field, when the warning is field-scoped.
    pub field: Option<String>,
    /// Human-readable reason.
    pub reason: String,
    /// Whether the whole model was excluded from the schema.
    pub model_excluded: bool,
}

impl fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}.{}: {}", self.model, field, self.reason),
            None => write!(f, "{}: {}", self.model, self.reason),
        }
    }
}

/// The result of an extraction run: the desired schema plus warnings.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// The desired schema.
    pub schema: Schema,
    /// Skipped models and fields, in scan order.
    pub warnings: Vec<ExtractionWarning>,
}

impl Extraction {
    /// Whether every registered model extracted without warnings.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Names of models that were excluded entirely.
    pub fn excluded_models(&self) -> Vec<&str> {
        self.warnings
            .iter()
            .filter(|w| w.model_excluded)
            .map(|w| w.model.as_str())
            .collect()
    }
}

/// Turns registered model descriptors into the desired [`Schema`].
pub struct Extractor<'a, M: TypeMapper + ?Sized> {
    mapper: &'a M,
}

impl<'a, M: TypeMapper + ?Sized> Extractor<'a, M> {
    /// Create an extractor using the given dialect type mapper.
    pub fn new(mapper: &'a M) -> Self {
        Self { mapper }
    }

    /// Extract a schema from every model in the registry.
    pub fn extract(&self, registry: &ModelRegistry) -> Extraction {
        let mut extraction = Extraction::default();

        for model in registry.iter() {
            let table_name = derived_table_name(model);

            if extraction.schema.contains_table(&table_name) {
                let warning = ExtractionWarning {
                    model: model.name.clone(),
                    field: None,
                    reason: format!("table `{}` already produced by another model", table_name),
                    model_excluded: true,
                };
                warn!(model = %model.name, table = %table_name, "Skipping model: duplicate table");
                extraction.warnings.push(warning);
                continue;
            }

            if let Some(table) = self.extract_model(model, registry, &mut extraction.warnings) {
                extraction.schema.add_table(table);
            }
        }

        debug!(
            tables = extraction.schema.len(),
            warnings = extraction.warnings.len(),
            "Extracted desired schema"
        );
        extraction
    }

    /// Extract one model into a table, or `None` when the model is excluded.
    fn extract_model(
        &self,
        model: &ModelDescriptor,
        registry: &ModelRegistry,
        warnings: &mut Vec<ExtractionWarning>,
    ) -> Option<Table> {
        let table_name = derived_table_name(model);
        let mut table = Table::new(&table_name);

        for field in &model.fields {
            if let Some(target) = &field.references {
                let Some(target_model) = registry.get(target) else {
                    let warning = ExtractionWarning {
                        model: model.name.clone(),
                        field: Some(field.name.clone()),
                        reason: format!("references undeclared model `{}`", target),
                        model_excluded: true,
                    };
                    warn!(
                        model = %model.name,
                        field = %field.name,
                        target = %target,
                        "Skipping model: reference target not declared"
                    );
                    warnings.push(warning);
                    return None;
                };
                self.add_reference(&mut table, &table_name, field, target_model);
            } else if let Some(scalar) = field.scalar {
                self.add_scalar(&mut table, scalar, field);
            } else {
                let warning = ExtractionWarning {
                    model: model.name.clone(),
                    field: Some(field.name.clone()),
                    reason: "field declares no type".to_string(),
                    model_excluded: false,
                };
                warn!(model = %model.name, field = %field.name, "Skipping untyped field");
                warnings.push(warning);
            }
        }

        self.apply_index_hints(&mut table, model, warnings);
        self.apply_overrides(&mut table, model, warnings);
        Some(table)
    }

    /// Add a column for a scalar field.
    fn add_scalar(&self, table: &mut Table, scalar: ScalarType, field: &FieldDescriptor) {
        let sql_type = self.mapper.column_type(scalar, &field.name);
        let mut column = Column::new(&field.name, sql_type).nullable(field.nullable);

        if field.name == "id" {
            column.primary_key = true;
        }
        if TIMESTAMP_FIELDS.contains(&field.name.as_str()) {
            column.default = self.mapper.timestamp_default(&field.name);
        }
        table.add_column(column);
    }

    /// Add the synthesized column and constraint for a belongs-to field.
    fn add_reference(
        &self,
        table: &mut Table,
        table_name: &str,
        field: &FieldDescriptor,
        target: &ModelDescriptor,
    ) {
        let column_name = names::reference_column(&field.name);
        let sql_type = self.mapper.column_type(ScalarType::Uuid, &column_name);
        table.add_column(Column::new(&column_name, sql_type).nullable(field.nullable));

        let fk_name = names::foreign_key_name(table_name, &column_name);
        table.add_foreign_key(ForeignKey::new(
            fk_name,
            column_name,
            derived_table_name(target),
            target.primary_key_field(),
        ));
    }

    /// Turn index hints into named index entries.
    fn apply_index_hints(
        &self,
        table: &mut Table,
        model: &ModelDescriptor,
        warnings: &mut Vec<ExtractionWarning>,
    ) {
        for (column, kind) in &model.indexes {
            if table.get_column(column).is_none() {
                let warning = ExtractionWarning {
                    model: model.name.clone(),
                    field: Some(column.clone()),
                    reason: "index hint names an unknown column".to_string(),
                    model_excluded: false,
                };
                warn!(model = %model.name, column = %column, "Skipping index hint");
                warnings.push(warning);
                continue;
            }
            let name = names::index_name(*kind, &table.name, column);
            table.add_index(Index::new(name, [column.clone()], *kind));
        }
    }

    /// Apply declared column overrides after base inference.
    fn apply_overrides(
        &self,
        table: &mut Table,
        model: &ModelDescriptor,
        warnings: &mut Vec<ExtractionWarning>,
    ) {
        for (column, override_) in &model.overrides {
            let Some(col) = table.get_column_mut(column) else {
                let warning = ExtractionWarning {
                    model: model.name.clone(),
                    field: Some(column.clone()),
                    reason: "override names an unknown column".to_string(),
                    model_excluded: false,
                };
                warn!(model = %model.name, column = %column, "Skipping column override");
                warnings.push(warning);
                continue;
            };
            if let Some(sql_type) = &override_.sql_type {
                col.sql_type = sql_type.clone();
            }
            if let Some(nullable) = override_.nullable {
                col.nullable = nullable;
            }
            if let Some(default) = &override_.default {
                col.default = Some(default.clone());
            }
        }
    }
}

/// The table a model maps to: explicit override or the derived name.
pub fn derived_table_name(model: &ModelDescriptor) -> String {
    model
        .table
        .clone()
        .unwrap_or_else(|| names::table_name(&model.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ColumnOverride, FieldDescriptor};
    use crate::schema::IndexKind;

    /// Mirrors a MySQL-flavored mapping closely enough for extraction tests.
    struct TestMapper;

    impl TypeMapper for TestMapper {
        fn column_type(&self, scalar: ScalarType, field_name: &str) -> String {
            if TIMESTAMP_FIELDS.contains(&field_name) {
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
                "updated_at" => {
                    Some("CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP".to_string())
                }
                _ => None,
            }
        }
    }

    fn user_model() -> ModelDescriptor {
        ModelDescriptor::new("User")
            .field(FieldDescriptor::scalar("id", ScalarType::Uuid))
            .field(FieldDescriptor::scalar("email", ScalarType::String))
            .field(FieldDescriptor::scalar("created_at", ScalarType::DateTime))
            .field(FieldDescriptor::scalar("updated_at", ScalarType::DateTime))
            .unique("email")
    }

    fn post_model() -> ModelDescriptor {
        ModelDescriptor::new("Post")
            .field(FieldDescriptor::scalar("id", ScalarType::Uuid))
            .field(FieldDescriptor::scalar("title", ScalarType::String))
            .field(FieldDescriptor::reference("author", "User"))
            .index("title")
    }

    fn extract(models: Vec<ModelDescriptor>) -> Extraction {
        let mut registry = ModelRegistry::new();
        for model in models {
            registry.register(model).unwrap();
        }
        Extractor::new(&TestMapper).extract(&registry)
    }

    // ==================== Basic Extraction Tests ====================

    #[test]
    fn test_extract_scalar_model() {
        let extraction = extract(vec![user_model()]);
        assert!(extraction.is_clean());

        let users = extraction.schema.get_table("users").expect("users table");
        assert_eq!(users.columns.len(), 4);

        let id = users.get_column("id").unwrap();
        assert!(id.primary_key);
        assert_eq!(id.sql_type, "CHAR(36)");

        let email = users.get_column("email").unwrap();
        assert_eq!(email.sql_type, "VARCHAR(255)");
        assert!(!email.nullable);
    }

    #[test]
    fn test_timestamp_fields_get_defaults() {
        let extraction = extract(vec![user_model()]);
        let users = extraction.schema.get_table("users").unwrap();

        let created = users.get_column("created_at").unwrap();
        assert_eq!(created.sql_type, "DATETIME");
        assert_eq!(created.default.as_deref(), Some("CURRENT_TIMESTAMP"));

        let updated = users.get_column("updated_at").unwrap();
        assert_eq!(
            updated.default.as_deref(),
            Some("CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP")
        );
    }

    #[test]
    fn test_table_name_override() {
        let model = ModelDescriptor::new("Post")
            .table("articles")
            .field(FieldDescriptor::scalar("id", ScalarType::Uuid));
        let extraction = extract(vec![model]);
        assert!(extraction.schema.contains_table("articles"));
        assert!(!extraction.schema.contains_table("posts"));
    }

    #[test]
    fn test_index_hints_produce_named_indexes() {
        let extraction = extract(vec![user_model()]);
        let users = extraction.schema.get_table("users").unwrap();
        let index = users.get_index("uniq_users_email").expect("unique index");
        assert_eq!(index.kind, IndexKind::Unique);
        assert_eq!(index.columns, ["email"]);
    }

    // ==================== Reference Tests ====================

    #[test]
    fn test_belongs_to_synthesizes_column_and_fk() {
        let extraction = extract(vec![user_model(), post_model()]);
        assert!(extraction.is_clean());

        let posts = extraction.schema.get_table("posts").unwrap();
        let author_id = posts.get_column("author_id").expect("author_id column");
        assert_eq!(author_id.sql_type, "CHAR(36)");
        assert!(!author_id.primary_key);

        let fk = posts.get_foreign_key("fk_posts_author_id").expect("fk");
        assert_eq!(fk.column, "author_id");
        assert_eq!(fk.referenced_table, "users");
        assert_eq!(fk.referenced_column, "id");
    }

    #[test]
    fn test_nullable_reference() {
        let model = ModelDescriptor::new("Post")
            .field(FieldDescriptor::scalar("id", ScalarType::Uuid))
            .field(FieldDescriptor::reference("editor", "User").nullable());
        let extraction = extract(vec![user_model(), model]);
        let posts = extraction.schema.get_table("posts").unwrap();
        assert!(posts.get_column("editor_id").unwrap().nullable);
    }

    #[test]
    fn test_unknown_reference_excludes_model() {
        let extraction = extract(vec![post_model()]);

        assert!(!extraction.schema.contains_table("posts"));
        assert_eq!(extraction.excluded_models(), ["Post"]);
        let warning = &extraction.warnings[0];
        assert_eq!(warning.field.as_deref(), Some("author"));
        assert!(warning.reason.contains("undeclared model `User`"));
    }

    #[test]
    fn test_unknown_reference_does_not_stop_scan() {
        let extraction = extract(vec![post_model(), user_model()]);
        // Post is excluded, User still extracts.
        assert!(extraction.schema.contains_table("users"));
        assert!(!extraction.schema.contains_table("posts"));
    }

    // ==================== Warning Tests ====================

    #[test]
    fn test_untyped_field_skipped_not_fatal() {
        let model = ModelDescriptor::new("Draft")
            .field(FieldDescriptor::scalar("id", ScalarType::Uuid))
            .field(FieldDescriptor {
                name: "mystery".to_string(),
                scalar: None,
                references: None,
                nullable: false,
            });
        let extraction = extract(vec![model]);

        let drafts = extraction.schema.get_table("drafts").unwrap();
        assert!(drafts.get_column("mystery").is_none());
        assert_eq!(extraction.warnings.len(), 1);
        assert!(!extraction.warnings[0].model_excluded);
    }

    #[test]
    fn test_hint_on_unknown_column_warns() {
        let model = ModelDescriptor::new("User")
            .field(FieldDescriptor::scalar("id", ScalarType::Uuid))
            .unique("emial");
        let extraction = extract(vec![model]);
        assert_eq!(extraction.warnings.len(), 1);
        assert!(extraction.warnings[0].reason.contains("unknown column"));
        let users = extraction.schema.get_table("users").unwrap();
        assert!(users.indexes.is_empty());
    }

    #[test]
    fn test_duplicate_table_excludes_second_model() {
        let a = ModelDescriptor::new("Person")
            .table("people")
            .field(FieldDescriptor::scalar("id", ScalarType::Uuid));
        let b = ModelDescriptor::new("Human")
            .table("people")
            .field(FieldDescriptor::scalar("id", ScalarType::Uuid));
        let extraction = extract(vec![a, b]);
        assert_eq!(extraction.schema.len(), 1);
        assert_eq!(extraction.excluded_models(), ["Human"]);
    }

    // ==================== Override Tests ====================

    #[test]
    fn test_overrides_apply_after_inference() {
        let model = ModelDescriptor::new("Post")
            .field(FieldDescriptor::scalar("id", ScalarType::Uuid))
            .field(FieldDescriptor::scalar("title", ScalarType::String))
            .override_column(
                "title",
                ColumnOverride::default()
                    .sql_type("VARCHAR(500)")
                    .nullable(true)
                    .default_expr("'untitled'"),
            );
        let extraction = extract(vec![model]);
        let title = extraction
            .schema
            .get_table("posts")
            .unwrap()
            .get_column("title")
            .unwrap();
        assert_eq!(title.sql_type, "VARCHAR(500)");
        assert!(title.nullable);
        assert_eq!(title.default.as_deref(), Some("'untitled'"));
    }

    // ==================== Determinism Tests ====================

    #[test]
    fn test_extraction_is_deterministic() {
        let first = extract(vec![user_model(), post_model()]);
        let second = extract(vec![user_model(), post_model()]);
        assert_eq!(first.schema, second.schema);
    }
}
