//! Lifecycle error types

use std::error::Error as StdError;

use leasepool_core::CoreError;
use leasepool_iam::error::ReconcileError;
use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Failure reported by the record store.
#[derive(Debug, Error)]
#[error("store error: {message}")]
pub struct StoreError {
    pub message: String,
    #[source]
    pub source: Option<BoxError>,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Failure reported by the work queue.
#[derive(Debug, Error)]
#[error("queue error: {message}")]
pub struct QueueError {
    pub message: String,
    #[source]
    pub source: Option<BoxError>,
}

impl QueueError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Errors returned by the lifecycle services.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The addressed record does not exist.
    #[error("{resource} '{id}' not found")]
    NotFound { resource: &'static str, id: String },

    /// The request was rejected before reaching the store.
    #[error("invalid {resource} request: {field}: {message}")]
    Validation {
        resource: &'static str,
        field: String,
        message: String,
    },

    /// The account cannot take the requested status.
    #[error("account cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Record store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Work queue failure.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// Principal reconciliation failure.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// A stored record could not be used.
    #[error(transparent)]
    Core(CoreError),
}

impl From<CoreError> for LifecycleError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidTransition { from, to } => {
                LifecycleError::InvalidTransition { from, to }
            }
            other => LifecycleError::Core(other),
        }
    }
}

impl LifecycleError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        LifecycleError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn validation(
        resource: &'static str,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        LifecycleError::Validation {
            resource,
            field: field.into(),
            message: message.into(),
        }
    }

    /// Check if the caller caused this error.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LifecycleError::NotFound { .. }
                | LifecycleError::Validation { .. }
                | LifecycleError::InvalidTransition { .. }
        )
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            LifecycleError::NotFound { .. } => "NOT_FOUND",
            LifecycleError::Validation { .. } => "VALIDATION_FAILED",
            LifecycleError::InvalidTransition { .. } => "INVALID_TRANSITION",
            LifecycleError::Store(_) => "STORE_ERROR",
            LifecycleError::Queue(_) => "QUEUE_ERROR",
            LifecycleError::Reconcile(e) => e.error_code(),
            LifecycleError::Core(e) => e.error_code(),
        }
    }
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;
