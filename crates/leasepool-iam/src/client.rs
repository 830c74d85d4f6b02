//! Identity-provider capability
//!
//! The reconcilers never talk to a concrete identity-provider SDK. They
//! call [`IamApi`], and every implementation must classify its failures
//! into [`IamError`] categories so that "already exists" and "no such
//! entity" can be told apart from real failures.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leasepool_core::{Account, Arn};
use serde::{Deserialize, Serialize};

use crate::error::IamResult;

/// Key/value tag applied to a role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Input to [`IamApi::create_role`].
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRoleRequest {
    pub role_name: String,
    pub assume_role_policy_document: String,
    pub description: String,
    /// Maximum session duration in seconds.
    pub max_session_duration: i32,
    pub tags: Vec<Tag>,
}

/// Input to [`IamApi::create_policy`].
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePolicyRequest {
    pub policy_name: String,
    pub description: String,
    pub policy_document: String,
}

/// One stored version of a managed policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyVersion {
    pub version_id: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Calls the reconcilers make against the identity provider.
#[async_trait]
pub trait IamApi: Send + Sync {
    async fn create_role(&self, request: CreateRoleRequest) -> IamResult<()>;

    async fn delete_role(&self, role_name: &str) -> IamResult<()>;

    async fn create_policy(&self, request: CreatePolicyRequest) -> IamResult<()>;

    async fn delete_policy(&self, policy_arn: &Arn) -> IamResult<()>;

    /// Store a new version of an existing policy, optionally making it the
    /// version in effect.
    async fn create_policy_version(
        &self,
        policy_arn: &Arn,
        document: &str,
        set_as_default: bool,
    ) -> IamResult<()>;

    async fn delete_policy_version(&self, policy_arn: &Arn, version_id: &str) -> IamResult<()>;

    /// List every stored version of a policy, in no particular order.
    async fn list_policy_versions(&self, policy_arn: &Arn) -> IamResult<Vec<PolicyVersion>>;

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &Arn) -> IamResult<()>;

    async fn detach_role_policy(&self, role_name: &str, policy_arn: &Arn) -> IamResult<()>;
}

/// Resolves the identity-provider client that operates inside an account.
///
/// Production implementations assume the account's admin role before
/// building the client.
#[async_trait]
pub trait IamClientProvider: Send + Sync {
    async fn client_for(&self, account: &Account) -> IamResult<Arc<dyn IamApi>>;
}

/// Provider that hands out the same client for every account.
pub struct StaticIamClientProvider {
    client: Arc<dyn IamApi>,
}

impl StaticIamClientProvider {
    pub fn new(client: Arc<dyn IamApi>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IamClientProvider for StaticIamClientProvider {
    async fn client_for(&self, _account: &Account) -> IamResult<Arc<dyn IamApi>> {
        Ok(Arc::clone(&self.client))
    }
}
