//! Error types for descriptor loading and registration.

use miette::Diagnostic;
use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur while loading or registering model descriptors.
#[derive(Error, Debug, Diagnostic)]
pub enum SchemaError {
    /// Error reading a descriptor file or directory.
    #[error("failed to read `{path}`")]
    #[diagnostic(code(remodel::schema::io_error))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A descriptor file did not parse as a model declaration.
    #[error("invalid model declaration in `{path}`: {message}")]
    #[diagnostic(
        code(remodel::schema::invalid_descriptor),
        help("descriptor files are TOML with `name`, `[[fields]]`, `[indexes]`, and `[overrides]` sections")
    )]
    Descriptor { path: String, message: String },

    /// Invalid model definition.
    #[error("invalid model `{name}`: {message}")]
    #[diagnostic(code(remodel::schema::invalid_model))]
    InvalidModel { name: String, message: String },

    /// Duplicate definition.
    #[error("duplicate {kind} `{name}`")]
    #[diagnostic(code(remodel::schema::duplicate))]
    Duplicate { kind: String, name: String },
}

impl SchemaError {
    /// Create an I/O error tagged with the path that failed.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a descriptor parse error.
    pub fn descriptor(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Descriptor {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-model error.
    pub fn invalid_model(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidModel {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a duplicate-definition error.
    pub fn duplicate(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Duplicate {
            kind: kind.into(),
            name: name.into(),
        }
    }
}
