//! Core error types
//!
//! Construction and state-machine failures for the shared records.

use thiserror::Error;

/// Errors raised while constructing or mutating core records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// An identifier failed validation.
    #[error("invalid {kind} '{value}': {message}")]
    InvalidIdentifier {
        kind: &'static str,
        value: String,
        message: String,
    },

    /// A resource name could not be parsed or built.
    #[error("invalid resource name '{value}': {message}")]
    InvalidArn { value: String, message: String },

    /// The requested status change is not part of the lifecycle.
    #[error("account cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

impl CoreError {
    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::InvalidIdentifier { .. } => "INVALID_IDENTIFIER",
            CoreError::InvalidArn { .. } => "INVALID_ARN",
            CoreError::InvalidTransition { .. } => "INVALID_TRANSITION",
        }
    }

    pub(crate) fn invalid_arn(value: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::InvalidArn {
            value: value.into(),
            message: message.into(),
        }
    }
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
