use thiserror::Error;

/// Core error types for RecipeBox domain values
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid {kind} ID: {value}")]
    InvalidId { kind: &'static str, value: String },

    #[error("Invalid record: {message}")]
    InvalidRecord { message: String },

    #[error("Unknown visibility: {0}")]
    UnknownVisibility(String),
}

impl CoreError {
    /// Create a new InvalidId error
    pub fn invalid_id(kind: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidId {
            kind,
            value: value.into(),
        }
    }

    /// Create a new InvalidRecord error
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
