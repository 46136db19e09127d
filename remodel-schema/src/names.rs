//! Naming conventions shared by extraction and diffing.
//!
//! Every derived name here is deterministic: the same model declaration
//! always produces the same table, column, index, and constraint names, so
//! repeated extraction runs compare equal and diffs stay stable.

use convert_case::{Case, Casing};

use crate::schema::IndexKind;

/// Derive a table name from a model type name.
///
/// `BlogPost` becomes `blog_posts`, `Category` becomes `categories`.
pub fn table_name(model_name: &str) -> String {
    pluralize(&model_name.to_case(Case::Snake))
}

/// Pluralize a snake_case name: append `s`, or swap a trailing `y` for `ies`.
pub fn pluralize(name: &str) -> String {
    match name.strip_suffix('y') {
        Some(stem) => format!("{}ies", stem),
        None => format!("{}s", name),
    }
}

/// Column name synthesized for a belongs-to reference field.
pub fn reference_column(field_name: &str) -> String {
    format!("{}_id", field_name)
}

/// Deterministic index name: `idx_`, `uniq_`, or `ft_` plus table and column.
pub fn index_name(kind: IndexKind, table: &str, column: &str) -> String {
    let prefix = match kind {
        IndexKind::Index => "idx",
        IndexKind::Unique => "uniq",
        IndexKind::Fulltext => "ft",
    };
    format!("{}_{}_{}", prefix, table, column)
}

/// Deterministic foreign-key constraint name.
pub fn foreign_key_name(table: &str, column: &str) -> String {
    format!("fk_{}_{}", table, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_simple() {
        assert_eq!(table_name("User"), "users");
        assert_eq!(table_name("Post"), "posts");
    }

    #[test]
    fn test_table_name_multi_word() {
        assert_eq!(table_name("BlogPost"), "blog_posts");
        assert_eq!(table_name("ApiToken"), "api_tokens");
    }

    #[test]
    fn test_table_name_trailing_y() {
        assert_eq!(table_name("Category"), "categories");
        assert_eq!(table_name("Company"), "companies");
    }

    #[test]
    fn test_pluralize_is_not_smart() {
        // Two rules only; irregular forms need a table override.
        assert_eq!(pluralize("status"), "statuss");
        assert_eq!(pluralize("person"), "persons");
    }

    #[test]
    fn test_reference_column() {
        assert_eq!(reference_column("author"), "author_id");
    }

    #[test]
    fn test_index_names() {
        assert_eq!(index_name(IndexKind::Index, "posts", "title"), "idx_posts_title");
        assert_eq!(index_name(IndexKind::Unique, "users", "email"), "uniq_users_email");
        assert_eq!(index_name(IndexKind::Fulltext, "posts", "body"), "ft_posts_body");
    }

    #[test]
    fn test_foreign_key_name() {
        assert_eq!(foreign_key_name("posts", "author_id"), "fk_posts_author_id");
    }
}
