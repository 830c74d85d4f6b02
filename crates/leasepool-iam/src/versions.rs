//! Policy version pruning
//!
//! The identity provider keeps at most [`MAX_POLICY_VERSIONS`] versions
//! per managed policy and rejects new versions once the history is full.
//! Before a version is created the pruner frees a slot by deleting the
//! oldest version that is not the default. The default version is never
//! deleted.
//!
//! List-then-delete is not atomic. Two reconciliations racing on the same
//! policy may both see a full history; the loser's create fails and is
//! retried, at which point capacity is evaluated again.

use leasepool_core::{AccountId, Arn};
use tracing::{info, instrument, warn};

use crate::client::{IamApi, PolicyVersion};
use crate::error::{ReconcileError, ReconcileResult, ResourceKind};

/// Maximum number of versions the identity provider stores per policy.
pub const MAX_POLICY_VERSIONS: usize = 5;

/// Pick the non-default version with the earliest creation time.
#[must_use]
pub fn oldest_non_default(versions: &[PolicyVersion]) -> Option<&PolicyVersion> {
    versions
        .iter()
        .filter(|v| !v.is_default)
        .min_by_key(|v| v.created_at)
}

/// Frees policy version slots inside one account.
pub struct VersionPruner<'a> {
    iam: &'a dyn IamApi,
    account_id: &'a AccountId,
}

impl<'a> VersionPruner<'a> {
    pub fn new(iam: &'a dyn IamApi, account_id: &'a AccountId) -> Self {
        Self { iam, account_id }
    }

    /// Make sure one more version can be created on `policy_arn`.
    #[instrument(skip(self), fields(account_id = %self.account_id))]
    pub async fn ensure_capacity(&self, policy_arn: &Arn) -> ReconcileResult<()> {
        let versions = self.list_versions(policy_arn).await?;
        if versions.len() < MAX_POLICY_VERSIONS {
            return Ok(());
        }

        match oldest_non_default(&versions) {
            Some(oldest) => {
                info!(
                    account_id = %self.account_id,
                    policy_arn = %policy_arn,
                    version_id = %oldest.version_id,
                    versions = versions.len(),
                    "Pruning oldest policy version"
                );
                self.delete_version(policy_arn, &oldest.version_id).await
            }
            None => {
                // Leave it to the create call to surface the failure.
                warn!(
                    account_id = %self.account_id,
                    policy_arn = %policy_arn,
                    versions = versions.len(),
                    "Policy version history is full but has no non-default version"
                );
                Ok(())
            }
        }
    }

    pub(crate) async fn list_versions(&self, policy_arn: &Arn) -> ReconcileResult<Vec<PolicyVersion>> {
        self.iam
            .list_policy_versions(policy_arn)
            .await
            .map_err(|e| {
                ReconcileError::internal(
                    ResourceKind::Policy,
                    policy_arn.to_string(),
                    "unexpected error listing policy versions",
                    e,
                )
            })
    }

    /// Delete one version. A version that is already gone is success.
    pub(crate) async fn delete_version(&self, policy_arn: &Arn, version_id: &str) -> ReconcileResult<()> {
        match self.iam.delete_policy_version(policy_arn, version_id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_no_such_entity() => {
                info!(
                    account_id = %self.account_id,
                    policy_arn = %policy_arn,
                    version_id,
                    "{e}; ignoring"
                );
                Ok(())
            }
            Err(e) => Err(ReconcileError::internal(
                ResourceKind::PolicyVersion,
                format!("{policy_arn}:{version_id}"),
                "unexpected error deleting policy version",
                e,
            )),
        }
    }
}
