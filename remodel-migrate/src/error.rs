//! Error types for the migration engine.

use thiserror::Error;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Errors that can occur during migration operations.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database query or statement error.
    #[error("Database error: {0}")]
    Database(String),

    /// Could not reach or authenticate against the database.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Schema extraction or registry error.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Plan or ledger file could not be written.
    #[error("State file error: {0}")]
    State(String),

    /// Apply was requested but no plan has been generated.
    #[error("No migration plan found; run generate first")]
    NoPlan,

    /// The plan was already applied and `force` was not set.
    #[error("Plan already applied at {applied_at}; re-run with force to apply again")]
    AlreadyApplied {
        /// When the plan was applied.
        applied_at: String,
    },

    /// A single plan operation failed mid-apply.
    #[error("Operation '{op}' failed: {message}")]
    OperationFailed {
        /// Identifier of the failed operation.
        op: String,
        /// Underlying failure.
        message: String,
    },

    /// No driver registered for the requested dialect.
    #[error("Unsupported dialect '{dialect}'; known dialects: {known}")]
    UnsupportedDialect {
        /// The dialect that was requested.
        dialect: String,
        /// Comma-separated registered dialects.
        known: String,
    },

    /// The database URL could not be parsed.
    #[error("Invalid database URL: {0}")]
    InvalidUrl(String),

    /// No schema changes detected.
    #[error("No schema changes detected")]
    NoChanges,

    /// General migration error.
    #[error("Migration error: {0}")]
    Other(String),
}

impl MigrationError {
    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a schema error.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Create a state file error.
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Create an operation failure for the given op identifier.
    pub fn operation_failed(op: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OperationFailed {
            op: op.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported-dialect error listing the known dialects.
    pub fn unsupported_dialect(dialect: impl Into<String>, known: &[&str]) -> Self {
        Self::UnsupportedDialect {
            dialect: dialect.into(),
            known: known.join(", "),
        }
    }

    /// Create an invalid-URL error.
    pub fn invalid_url(msg: impl Into<String>) -> Self {
        Self::InvalidUrl(msg.into())
    }

    /// Create an other error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Check if this is a recoverable error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::AlreadyApplied { .. } | Self::NoChanges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MigrationError::operation_failed("addColumn:users.email", "duplicate column");
        let msg = err.to_string();
        assert!(msg.contains("addColumn:users.email"));
        assert!(msg.contains("duplicate column"));
    }

    #[test]
    fn test_unsupported_dialect_lists_known() {
        let err = MigrationError::unsupported_dialect("sqlite", &["mysql", "postgres"]);
        let msg = err.to_string();
        assert!(msg.contains("sqlite"));
        assert!(msg.contains("mysql, postgres"));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(MigrationError::NoChanges.is_recoverable());
        assert!(
            MigrationError::AlreadyApplied {
                applied_at: "2026-01-01T00:00:00Z".to_string()
            }
            .is_recoverable()
        );
        assert!(!MigrationError::NoPlan.is_recoverable());
        assert!(!MigrationError::database("connection reset").is_recoverable());
    }
}
