//! Core error types for breathwork-core.
//!
//! The timer itself has no runtime failure modes; everything here is either a
//! construction-time contract violation or a storage/configuration problem.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for breathwork-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A required phase duration is zero, negative or not finite.
    #[error("Invalid duration for phase '{phase}': {value} (must be a finite number > 0)")]
    NonPositiveDuration { phase: &'static str, value: f64 },

    /// An optional hold duration is negative or not finite.
    #[error("Invalid duration for phase '{phase}': {value} (must be a finite number >= 0)")]
    NegativeDuration { phase: &'static str, value: f64 },

    /// Session must run at least one cycle.
    #[error("Total cycles must be at least 1, got {0}")]
    ZeroCycles(u32),

    /// Rating outside its allowed scale.
    #[error("Rating '{field}' must be between {min} and {max}, got {value}")]
    RatingOutOfRange {
        field: &'static str,
        value: u8,
        min: u8,
        max: u8,
    },

    /// Measurement window too short to derive a rate from.
    #[error("Measurement window of {elapsed_secs:.1}s is shorter than the minimum {min_secs:.1}s")]
    WindowTooShort { elapsed_secs: f64, min_secs: f64 },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_messages_name_the_phase() {
        let err = ValidationError::NonPositiveDuration {
            phase: "inhale",
            value: 0.0,
        };
        assert!(err.to_string().contains("inhale"));
    }

    #[test]
    fn validation_converts_into_core_error() {
        let err: CoreError = ValidationError::ZeroCycles(0).into();
        assert!(matches!(err, CoreError::Validation(ValidationError::ZeroCycles(0))));
    }
}
