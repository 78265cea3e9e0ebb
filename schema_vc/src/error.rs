//! Error types for schema_vc

use std::path::PathBuf;

use thiserror::Error;

/// Result type for schema_vc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for schema_vc
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Schema introspection error: {0}")]
    IntrospectionError(String),

    /// A statement failed mid-batch. `executed` statements before it were applied
    /// and are not rolled back; the statements after it were not attempted.
    #[error("Statement failed after {executed} successful statement(s): {statement}: {source}")]
    ExecutionError {
        statement: String,
        executed: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Could not write schema file {}: {source}", path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// Wrap any error raised while reading the live schema
    pub fn introspection(error: impl std::fmt::Display) -> Self {
        Error::IntrospectionError(error.to_string())
    }
}

/// Convert Serde JSON errors to schema_vc errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert YAML errors to schema_vc errors
impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to schema_vc errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_error_discloses_partial_application() {
        let err = Error::ExecutionError {
            statement: "ALTER TABLE t DROP COLUMN x;".to_string(),
            executed: 2,
            source: Box::new(Error::DatabaseError("no such column".to_string())),
        };

        let message = err.to_string();
        assert!(message.contains("after 2 successful"));
        assert!(message.contains("ALTER TABLE t DROP COLUMN x;"));
        assert!(message.contains("no such column"));
    }
}
