//! Reconciliation error types
//!
//! Two layers: [`IamError`] is what the identity-provider capability
//! reports, classified into the categories the reconcilers branch on.
//! [`ReconcileError`] is what the engine reports to its callers.

use std::fmt;

use leasepool_core::{AccountId, CoreError};
use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Error reported by the identity-provider capability.
#[derive(Debug, Error)]
pub enum IamError {
    /// The entity being created already exists.
    #[error("entity already exists: {message}")]
    AlreadyExists { message: String },

    /// The entity being read, changed or removed does not exist.
    #[error("no such entity: {message}")]
    NoSuchEntity { message: String },

    /// Any other failure.
    #[error("{message}")]
    Other {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

impl IamError {
    /// Create an already-exists error.
    pub fn already_exists(message: impl Into<String>) -> Self {
        IamError::AlreadyExists {
            message: message.into(),
        }
    }

    /// Create a no-such-entity error.
    pub fn no_such_entity(message: impl Into<String>) -> Self {
        IamError::NoSuchEntity {
            message: message.into(),
        }
    }

    /// Create an uncategorised error.
    pub fn other(message: impl Into<String>) -> Self {
        IamError::Other {
            message: message.into(),
            source: None,
        }
    }

    /// Create an uncategorised error with source.
    pub fn other_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        IamError::Other {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, IamError::AlreadyExists { .. })
    }

    #[must_use]
    pub fn is_no_such_entity(&self) -> bool {
        matches!(self, IamError::NoSuchEntity { .. })
    }
}

/// Result type for identity-provider calls.
pub type IamResult<T> = Result<T, IamError>;

/// Error rendering a policy or trust document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// No template exists at the location.
    #[error("template not found: {location}")]
    NotFound { location: String },

    /// The template exists but could not be rendered.
    #[error("failed to render template {location}: {message}")]
    Render { location: String, message: String },
}

/// Kind of identity-provider object a failure relates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Role,
    Policy,
    PolicyVersion,
    Attachment,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Role => "role",
            ResourceKind::Policy => "policy",
            ResourceKind::PolicyVersion => "policy version",
            ResourceKind::Attachment => "attachment",
        };
        f.write_str(s)
    }
}

/// Error reported by the reconciliation engine.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// An identity-provider call failed in a way that is not an
    /// intentional no-op.
    #[error("{message} ({kind} {name})")]
    Internal {
        kind: ResourceKind,
        name: String,
        message: String,
        #[source]
        source: IamError,
    },

    /// A document could not be rendered; nothing was written.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A role or policy name derived from configuration is invalid.
    #[error(transparent)]
    InvalidResourceName(#[from] CoreError),

    /// No identity-provider client could be obtained for the account.
    #[error("no identity-provider client for account {account_id}")]
    ClientUnavailable {
        account_id: AccountId,
        #[source]
        source: IamError,
    },
}

impl ReconcileError {
    /// Wrap an identity-provider failure.
    pub fn internal(
        kind: ResourceKind,
        name: impl Into<String>,
        message: impl Into<String>,
        source: IamError,
    ) -> Self {
        ReconcileError::Internal {
            kind,
            name: name.into(),
            message: message.into(),
            source,
        }
    }

    /// The resource kind, for internal failures.
    #[must_use]
    pub fn resource_kind(&self) -> Option<ResourceKind> {
        match self {
            ReconcileError::Internal { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            ReconcileError::Internal { .. } => "RECONCILE_INTERNAL",
            ReconcileError::Template(TemplateError::NotFound { .. }) => "TEMPLATE_NOT_FOUND",
            ReconcileError::Template(TemplateError::Render { .. }) => "TEMPLATE_RENDER_FAILED",
            ReconcileError::InvalidResourceName(_) => "INVALID_RESOURCE_NAME",
            ReconcileError::ClientUnavailable { .. } => "CLIENT_UNAVAILABLE",
        }
    }
}

/// Result type for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;
