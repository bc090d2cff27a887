//! Error types for arorm

use thiserror::Error;

/// Result type alias for arorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for database and ORM operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Unknown database instance requested without configuration, or a bad DSN
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unknown column or relationship alias accessed on an entity
    #[error("Missing property: {model}::{property}")]
    MissingProperty { model: String, property: String },

    /// Relationship alias that is not declared (or lacks a `through` table)
    #[error("Unknown relation: {model}::{alias}")]
    UnknownRelation { model: String, alias: String },

    /// DELETE without WHERE, or DELETE with an empty/zero id
    #[error("Illegal delete: {0}")]
    IllegalDelete(String),

    /// UPDATE without WHERE, or UPDATE without any column to set
    #[error("Illegal update: {0}")]
    IllegalUpdate(String),

    /// Statement preparation/execution failure reported by the driver
    #[error("Driver error: {0}")]
    Driver(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Builder misuse
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a driver error
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver(message.into())
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a missing property error
    pub fn missing_property(model: impl Into<String>, property: impl Into<String>) -> Self {
        Self::MissingProperty {
            model: model.into(),
            property: property.into(),
        }
    }

    /// Create an unknown relation error
    pub fn unknown_relation(model: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::UnknownRelation {
            model: model.into(),
            alias: alias.into(),
        }
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this is an illegal delete error
    pub fn is_illegal_delete(&self) -> bool {
        matches!(self, Self::IllegalDelete(_))
    }

    /// Check if this is an illegal update error
    pub fn is_illegal_update(&self) -> bool {
        matches!(self, Self::IllegalUpdate(_))
    }

    /// Check if this is a missing property error
    pub fn is_missing_property(&self) -> bool {
        matches!(self, Self::MissingProperty { .. })
    }

    /// Check if this error came from the driver
    pub fn is_driver(&self) -> bool {
        matches!(self, Self::Driver(_))
    }

    /// Prefix the message with context, keeping the variant.
    ///
    /// Only message-carrying variants are rewritten; structured variants pass through.
    pub fn context(self, context: &str) -> Self {
        match self {
            Self::Driver(msg) => Self::Driver(format!("{context}: {msg}")),
            Self::IllegalDelete(msg) => Self::IllegalDelete(format!("{context}: {msg}")),
            Self::IllegalUpdate(msg) => Self::IllegalUpdate(format!("{context}: {msg}")),
            Self::Other(msg) => Self::Other(format!("{context}: {msg}")),
            other => other,
        }
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for OrmError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Driver(err.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for OrmError {
    fn from(err: tokio_postgres::Error) -> Self {
        match err.as_db_error() {
            Some(db_err) => Self::Driver(format!(
                "{} ({}): {}",
                db_err.severity(),
                db_err.code().code(),
                db_err.message()
            )),
            None => Self::Driver(err.to_string()),
        }
    }
}
