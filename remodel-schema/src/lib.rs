//! # remodel-schema
//!
//! Schema data model and desired-schema extraction for remodel.
//!
//! This crate provides:
//! - Value types describing a relational schema (tables, columns, indexes,
//!   foreign keys) shared by every other remodel crate
//! - Model descriptors: the declarative, serde-friendly description of an
//!   application model (fields, references, index hints, column overrides)
//! - A registry that collects descriptors from code or from a directory of
//!   TOML declaration files
//! - The extractor that turns registered descriptors into the *desired*
//!   [`Schema`], using a dialect-supplied [`TypeMapper`] for column types
//!
//! ## Example
//!
//! ```rust,ignore
//! use remodel_schema::{Extractor, FieldDescriptor, ModelDescriptor, ModelRegistry, ScalarType};
//!
//! let mut registry = ModelRegistry::new();
//! registry.register(
//!     ModelDescriptor::new("User")
//!         .field(FieldDescriptor::scalar("id", ScalarType::Uuid))
//!         .field(FieldDescriptor::scalar("email", ScalarType::String))
//!         .unique("email"),
//! )?;
//!
//! let extraction = Extractor::new(&mapper).extract(&registry);
//! let desired = extraction.schema;
//! ```

pub mod descriptor;
pub mod error;
pub mod extract;
pub mod names;
pub mod schema;

pub use descriptor::{
    ColumnOverride, FieldDescriptor, ModelDescriptor, ModelRegistry, ScalarType,
};
pub use error::{SchemaError, SchemaResult};
pub use extract::{Extraction, ExtractionWarning, Extractor, TypeMapper};
pub use schema::{Column, ForeignKey, Index, IndexKind, ReferentialAction, Schema, Table};
