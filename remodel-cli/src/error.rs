//! CLI error types and result alias.

use miette::Diagnostic;
use remodel_migrate::MigrationError;
use remodel_schema::SchemaError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(remodel::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(code(remodel::config))]
    Config(String),

    /// Model descriptor or extraction error
    #[error("Schema error: {0}")]
    #[diagnostic(code(remodel::schema))]
    Schema(String),

    /// Planning, state, or apply error
    #[error("Migration error: {0}")]
    #[diagnostic(code(remodel::migration))]
    Migration(String),

    /// Database error
    #[error("Database error: {0}")]
    #[diagnostic(code(remodel::database))]
    Database(String),

    /// Command error
    #[error("Command error: {0}")]
    #[diagnostic(code(remodel::command))]
    Command(String),
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::Config(format!("Failed to parse TOML: {}", err))
    }
}

impl From<toml::ser::Error> for CliError {
    fn from(err: toml::ser::Error) -> Self {
        CliError::Config(format!("Failed to serialize TOML: {}", err))
    }
}

impl From<SchemaError> for CliError {
    fn from(err: SchemaError) -> Self {
        CliError::Schema(err.to_string())
    }
}

impl From<MigrationError> for CliError {
    fn from(err: MigrationError) -> Self {
        match err {
            MigrationError::Connection(msg) => {
                CliError::Database(format!("Connection failed: {}", msg))
            }
            MigrationError::Database(msg) => CliError::Database(msg),
            other => CliError::Migration(other.to_string()),
        }
    }
}
