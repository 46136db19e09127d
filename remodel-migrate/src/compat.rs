//! Column type compatibility classification.
//!
//! The diff engine marks a `modifyColumn` destructive when the new type
//! narrows the old one. Narrowing is decided structurally: a type expression
//! is parsed into a base name plus numeric parameters, then compared either
//! by parameter (same base) or against the safe-widening families (different
//! base). Anything not provably safe counts as narrowing.

use std::sync::OnceLock;

use regex_lite::Regex;

/// Widening order within the integer family.
const INTEGER_FAMILY: &[&str] = &["TINYINT", "SMALLINT", "INT", "BIGINT"];
/// Widening order within the character family.
const CHARACTER_FAMILY: &[&str] = &["CHAR", "VARCHAR", "TEXT", "MEDIUMTEXT", "LONGTEXT"];
/// Widening order within the numeric family.
const NUMERIC_FAMILY: &[&str] = &["DECIMAL", "FLOAT", "DOUBLE"];

/// How a column type change relates to the data it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeChange {
    /// Same representable range.
    Unchanged,
    /// Every old value fits the new type.
    Widening,
    /// Values may be truncated or rejected.
    Narrowing,
}

/// A type expression split into base name and declared parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedType {
    /// Uppercased, alias-normalized base name, e.g. `VARCHAR`.
    pub base: String,
    /// Declared numeric parameters, e.g. `[10, 2]` for `DECIMAL(10,2)`.
    pub params: Vec<u32>,
}

/// Column attributes that do not change the base type's identity.
const ATTRIBUTE_WORDS: &[&str] = &["UNSIGNED", "SIGNED", "ZEROFILL"];

fn type_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z][A-Za-z0-9 ]*)\s*(?:\(\s*([0-9]+(?:\s*,\s*[0-9]+)*)\s*\))?\s*(.*)$")
            .expect("type pattern is valid")
    })
}

/// Parse a SQL type expression into base + parameters.
///
/// Unparseable expressions (enum literals, vendor oddities) fall back to the
/// whole uppercased string as the base, so they only ever compare equal to
/// themselves.
pub fn parse_sql_type(raw: &str) -> ParsedType {
    let Some(caps) = type_pattern().captures(raw) else {
        return ParsedType::opaque(raw);
    };

    // Anything after the parameter list must be a known attribute,
    // otherwise the whole expression is treated as opaque.
    let tail = caps.get(3).map(|m| m.as_str()).unwrap_or("");
    let tail_is_attributes = tail
        .split_whitespace()
        .all(|word| ATTRIBUTE_WORDS.contains(&word.to_uppercase().as_str()));
    if !tail_is_attributes {
        return ParsedType::opaque(raw);
    }

    let base = caps
        .get(1)
        .map(|m| normalize_base(m.as_str()))
        .unwrap_or_default();
    let params = caps
        .get(2)
        .map(|m| {
            m.as_str()
                .split(',')
                .filter_map(|p| p.trim().parse().ok())
                .collect()
        })
        .unwrap_or_default();
    ParsedType { base, params }
}

impl ParsedType {
    /// A type that only compares equal to itself.
    fn opaque(raw: &str) -> Self {
        Self {
            base: raw.trim().to_uppercase(),
            params: Vec::new(),
        }
    }
}

/// Canonical base name: case-folded, attribute words dropped, whitespace
/// collapsed, aliases resolved.
fn normalize_base(base: &str) -> String {
    let folded = base
        .to_uppercase()
        .split_whitespace()
        .filter(|word| !ATTRIBUTE_WORDS.contains(word))
        .collect::<Vec<_>>()
        .join(" ");
    match folded.as_str() {
        "INTEGER" | "INT4" => "INT".to_string(),
        "INT2" => "SMALLINT".to_string(),
        "INT8" => "BIGINT".to_string(),
        "CHARACTER" => "CHAR".to_string(),
        "CHARACTER VARYING" => "VARCHAR".to_string(),
        "DOUBLE PRECISION" => "DOUBLE".to_string(),
        "NUMERIC" => "DECIMAL".to_string(),
        "BOOL" => "BOOLEAN".to_string(),
        "TIMESTAMP WITHOUT TIME ZONE" => "TIMESTAMP".to_string(),
        "TIMESTAMP WITH TIME ZONE" => "TIMESTAMPTZ".to_string(),
        _ => folded,
    }
}

/// Classify a type change from `old` to `new`.
pub fn classify(old: &str, new: &str) -> TypeChange {
    let from = parse_sql_type(old);
    let to = parse_sql_type(new);

    if from.base == to.base {
        return compare_params(&from.params, &to.params);
    }
    if family_widens(&from.base, &to.base) {
        TypeChange::Widening
    } else {
        TypeChange::Narrowing
    }
}

/// Whether changing a column from `old` to `new` can lose data.
pub fn is_narrowing(old: &str, new: &str) -> bool {
    classify(old, new) == TypeChange::Narrowing
}

/// Compare parameter lists of the same base type.
///
/// A missing parameter list compares as equal; any position that shrinks
/// makes the whole change narrowing.
fn compare_params(from: &[u32], to: &[u32]) -> TypeChange {
    if from.is_empty() || to.is_empty() {
        return TypeChange::Unchanged;
    }

    let mut widened = false;
    for position in 0..from.len().max(to.len()) {
        match (from.get(position), to.get(position)) {
            (Some(f), Some(t)) if t < f => return TypeChange::Narrowing,
            (Some(f), Some(t)) if t > f => widened = true,
            _ => {}
        }
    }
    if widened {
        TypeChange::Widening
    } else {
        TypeChange::Unchanged
    }
}

/// Whether `to` sits later than `from` in a shared widening family.
fn family_widens(from: &str, to: &str) -> bool {
    for family in [INTEGER_FAMILY, CHARACTER_FAMILY, NUMERIC_FAMILY] {
        let from_rank = family.iter().position(|name| *name == from);
        let to_rank = family.iter().position(|name| *name == to);
        if let (Some(from_rank), Some(to_rank)) = (from_rank, to_rank) {
            return to_rank > from_rank;
        }
    }
    false
}
