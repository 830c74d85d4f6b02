//! # Principal Reconciliation
//!
//! Converges the IAM role and managed policy that a leased account's
//! consumer works under to the state described by configuration and
//! templates.
//!
//! ## Architecture
//!
//! ```text
//! PrincipalReconciler ──► RoleReconciler ───────┐
//!          │          ──► PolicyReconciler ──┐  │
//!          │                  │              │  │
//!          │                  ▼              │  │
//!          │             VersionPruner       │  │
//!          │          ──► AttachmentReconciler  │
//!          ▼                                 ▼  ▼
//!    TemplateStore                          IamApi
//! ```
//!
//! Every write is idempotent: "already exists" on create and "no such
//! entity" on delete are absorbed and logged. There is no locking; a
//! concurrent or retried reconciliation of the same account converges to
//! the same state.
//!
//! ## Example
//!
//! ```ignore
//! use leasepool_iam::prelude::*;
//!
//! let reconciler = PrincipalReconciler::new(clients, templates, Arc::new(config));
//! let result = reconciler.merge_principal(&mut account).await;
//! store.put_account(&account).await?;
//! result?;
//! ```

pub mod attachment;
#[cfg(feature = "aws")]
pub mod aws;
pub mod client;
pub mod config;
pub mod error;
pub mod policy;
pub mod principal;
pub mod role;
pub mod spec;
pub mod template;
pub mod versions;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::attachment::AttachmentReconciler;
    pub use crate::client::{
        CreatePolicyRequest, CreateRoleRequest, IamApi, IamClientProvider, PolicyVersion,
        StaticIamClientProvider, Tag,
    };
    pub use crate::config::{AuxiliaryPrincipal, ConfigError, PrincipalConfig};
    pub use crate::error::{
        IamError, IamResult, ReconcileError, ReconcileResult, ResourceKind, TemplateError,
    };
    pub use crate::policy::PolicyReconciler;
    pub use crate::principal::PrincipalReconciler;
    pub use crate::role::RoleReconciler;
    pub use crate::spec::{HashSlot, PolicySpec, PrincipalSpec, RoleSpec};
    pub use crate::template::{
        fingerprint, HandlebarsTemplateStore, MemoryTemplateSource, RenderedTemplate,
        TemplateLocation, TemplateSource, TemplateStore, TemplateVariables,
    };
    pub use crate::versions::{VersionPruner, MAX_POLICY_VERSIONS};
}

// Re-export async_trait for capability implementors
pub use async_trait::async_trait;
