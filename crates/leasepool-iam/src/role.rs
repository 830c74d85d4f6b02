//! Role convergence.

use leasepool_core::{AccountId, Arn};
use tracing::{info, instrument};

use crate::client::{CreateRoleRequest, IamApi, Tag};
use crate::error::{ReconcileError, ReconcileResult, ResourceKind};
use crate::spec::RoleSpec;

/// Tag key marking a role as managed by leasepool.
pub const MANAGED_TAG_KEY: &str = "Name";
/// Tag value marking a role as managed by leasepool.
pub const MANAGED_TAG_VALUE: &str = "LeasepoolPrincipal";

/// Creates and removes roles inside one account.
pub struct RoleReconciler<'a> {
    iam: &'a dyn IamApi,
    account_id: &'a AccountId,
}

impl<'a> RoleReconciler<'a> {
    pub fn new(iam: &'a dyn IamApi, account_id: &'a AccountId) -> Self {
        Self { iam, account_id }
    }

    /// Ensure the role exists. An existing role is left as it is.
    #[instrument(skip(self, spec, trust_policy), fields(account_id = %self.account_id, role = %spec.arn))]
    pub async fn merge_role(&self, spec: &RoleSpec, trust_policy: &str) -> ReconcileResult<()> {
        let mut tags = spec.tags.clone();
        tags.push(Tag::new(MANAGED_TAG_KEY, MANAGED_TAG_VALUE));

        let request = CreateRoleRequest {
            role_name: spec.name().to_string(),
            assume_role_policy_document: trust_policy.to_string(),
            description: spec.description.clone(),
            max_session_duration: spec.max_session_duration,
            tags,
        };

        match self.iam.create_role(request).await {
            Ok(()) => {
                info!(account_id = %self.account_id, role = %spec.arn, "Created role");
                Ok(())
            }
            Err(e) if e.is_already_exists() => {
                info!(account_id = %self.account_id, role = %spec.arn, "{e}; ignoring");
                Ok(())
            }
            Err(e) => Err(ReconcileError::internal(
                ResourceKind::Role,
                spec.arn.to_string(),
                "unexpected error creating role",
                e,
            )),
        }
    }

    /// Ensure the role is gone. A missing role is success.
    #[instrument(skip(self), fields(account_id = %self.account_id))]
    pub async fn delete_role(&self, role_arn: &Arn) -> ReconcileResult<()> {
        match self.iam.delete_role(role_arn.resource_name()).await {
            Ok(()) => {
                info!(account_id = %self.account_id, role = %role_arn, "Deleted role");
                Ok(())
            }
            Err(e) if e.is_no_such_entity() => {
                info!(account_id = %self.account_id, role = %role_arn, "{e}; ignoring");
                Ok(())
            }
            Err(e) => Err(ReconcileError::internal(
                ResourceKind::Role,
                role_arn.to_string(),
                "unexpected error deleting role",
                e,
            )),
        }
    }
}
