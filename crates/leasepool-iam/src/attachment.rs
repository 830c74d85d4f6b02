//! Role/policy attachment.

use leasepool_core::{AccountId, Arn};
use tracing::{info, instrument};

use crate::client::IamApi;
use crate::error::{ReconcileError, ReconcileResult, ResourceKind};

/// Links and unlinks a role and a managed policy.
pub struct AttachmentReconciler<'a> {
    iam: &'a dyn IamApi,
    account_id: &'a AccountId,
}

impl<'a> AttachmentReconciler<'a> {
    pub fn new(iam: &'a dyn IamApi, account_id: &'a AccountId) -> Self {
        Self { iam, account_id }
    }

    #[instrument(skip(self), fields(account_id = %self.account_id))]
    pub async fn attach(&self, role_arn: &Arn, policy_arn: &Arn) -> ReconcileResult<()> {
        match self
            .iam
            .attach_role_policy(role_arn.resource_name(), policy_arn)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_already_exists() => {
                info!(
                    account_id = %self.account_id,
                    role = %role_arn,
                    policy_arn = %policy_arn,
                    "{e}; ignoring"
                );
                Ok(())
            }
            Err(e) => Err(ReconcileError::internal(
                ResourceKind::Attachment,
                attachment_name(role_arn, policy_arn),
                "unexpected error attaching policy to role",
                e,
            )),
        }
    }

    #[instrument(skip(self), fields(account_id = %self.account_id))]
    pub async fn detach(&self, role_arn: &Arn, policy_arn: &Arn) -> ReconcileResult<()> {
        match self
            .iam
            .detach_role_policy(role_arn.resource_name(), policy_arn)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_no_such_entity() => {
                info!(
                    account_id = %self.account_id,
                    role = %role_arn,
                    policy_arn = %policy_arn,
                    "{e}; ignoring"
                );
                Ok(())
            }
            Err(e) => Err(ReconcileError::internal(
                ResourceKind::Attachment,
                attachment_name(role_arn, policy_arn),
                "unexpected error detaching policy from role",
                e,
            )),
        }
    }
}

fn attachment_name(role_arn: &Arn, policy_arn: &Arn) -> String {
    format!("{policy_arn} -> {role_arn}")
}
