//! Policy convergence
//!
//! A policy is only written when its rendered document differs from the
//! one last applied, as recorded by the caller's fingerprint. A missing
//! policy is created outright. An existing one gets a new default
//! version, after the pruner has made room.
//!
//! The returned fingerprint is only ever that of a document the identity
//! provider accepted. On any failure the caller keeps its old fingerprint
//! and the next reconciliation writes again.

use leasepool_core::{AccountId, Arn};
use tracing::{info, instrument};

use crate::client::{CreatePolicyRequest, IamApi};
use crate::error::{ReconcileError, ReconcileResult, ResourceKind};
use crate::spec::PolicySpec;
use crate::template::{RenderedTemplate, TemplateStore};
use crate::versions::VersionPruner;

/// Creates, updates and removes managed policies inside one account.
pub struct PolicyReconciler<'a> {
    iam: &'a dyn IamApi,
    templates: &'a dyn TemplateStore,
    account_id: &'a AccountId,
}

impl<'a> PolicyReconciler<'a> {
    pub fn new(
        iam: &'a dyn IamApi,
        templates: &'a dyn TemplateStore,
        account_id: &'a AccountId,
    ) -> Self {
        Self {
            iam,
            templates,
            account_id,
        }
    }

    /// Render the policy document described by `spec`.
    pub async fn render(&self, spec: &PolicySpec) -> ReconcileResult<RenderedTemplate> {
        Ok(self
            .templates
            .get_template_object(&spec.template, &spec.variables)
            .await?)
    }

    /// Render and converge the policy, returning the fingerprint now in
    /// effect.
    pub async fn merge_policy(
        &self,
        spec: &PolicySpec,
        current_hash: Option<&str>,
    ) -> ReconcileResult<String> {
        let rendered = self.render(spec).await?;
        self.apply(spec, &rendered, current_hash).await
    }

    /// Converge the policy to an already rendered document.
    #[instrument(skip(self, spec, rendered), fields(account_id = %self.account_id, policy_arn = %spec.arn))]
    pub async fn apply(
        &self,
        spec: &PolicySpec,
        rendered: &RenderedTemplate,
        current_hash: Option<&str>,
    ) -> ReconcileResult<String> {
        match current_hash {
            Some(old) if old == rendered.fingerprint => {
                info!(
                    account_id = %self.account_id,
                    policy_arn = %spec.arn,
                    old_hash = old,
                    new_hash = %rendered.fingerprint,
                    "SKIP: policy hash matches"
                );
                return Ok(old.to_string());
            }
            Some(old) => info!(
                account_id = %self.account_id,
                policy_arn = %spec.arn,
                old_hash = old,
                new_hash = %rendered.fingerprint,
                "UPDATE: policy hash does not match"
            ),
            None => info!(
                account_id = %self.account_id,
                policy_arn = %spec.arn,
                new_hash = %rendered.fingerprint,
                "UPDATE: no previous policy hash"
            ),
        }

        let request = CreatePolicyRequest {
            policy_name: spec.name().to_string(),
            description: spec.description.clone(),
            policy_document: rendered.document.clone(),
        };

        match self.iam.create_policy(request).await {
            Ok(()) => {
                info!(account_id = %self.account_id, policy_arn = %spec.arn, "Created policy");
                return Ok(rendered.fingerprint.clone());
            }
            Err(e) if e.is_already_exists() => {
                info!(account_id = %self.account_id, policy_arn = %spec.arn, "{e}; updating");
            }
            Err(e) => {
                return Err(ReconcileError::internal(
                    ResourceKind::Policy,
                    spec.arn.to_string(),
                    "unexpected error creating policy",
                    e,
                ));
            }
        }

        VersionPruner::new(self.iam, self.account_id)
            .ensure_capacity(&spec.arn)
            .await?;

        self.iam
            .create_policy_version(&spec.arn, &rendered.document, true)
            .await
            .map_err(|e| {
                ReconcileError::internal(
                    ResourceKind::PolicyVersion,
                    spec.arn.to_string(),
                    "unexpected error creating policy version",
                    e,
                )
            })?;

        info!(
            account_id = %self.account_id,
            policy_arn = %spec.arn,
            new_hash = %rendered.fingerprint,
            "Created default policy version"
        );
        Ok(rendered.fingerprint.clone())
    }

    /// Remove every non-default version, then the policy itself.
    ///
    /// Stops at the first failed version delete, leaving the rest in place.
    /// Each step is idempotent so a retry resumes where this one stopped.
    #[instrument(skip(self), fields(account_id = %self.account_id))]
    pub async fn delete_policy(&self, policy_arn: &Arn) -> ReconcileResult<()> {
        let pruner = VersionPruner::new(self.iam, self.account_id);

        let versions = match self.iam.list_policy_versions(policy_arn).await {
            Ok(versions) => versions,
            Err(e) if e.is_no_such_entity() => {
                info!(account_id = %self.account_id, policy_arn = %policy_arn, "{e}; ignoring");
                return Ok(());
            }
            Err(e) => {
                return Err(ReconcileError::internal(
                    ResourceKind::Policy,
                    policy_arn.to_string(),
                    "unexpected error listing policy versions",
                    e,
                ));
            }
        };

        for version in versions.iter().filter(|v| !v.is_default) {
            pruner.delete_version(policy_arn, &version.version_id).await?;
        }

        match self.iam.delete_policy(policy_arn).await {
            Ok(()) => {
                info!(account_id = %self.account_id, policy_arn = %policy_arn, "Deleted policy");
                Ok(())
            }
            Err(e) if e.is_no_such_entity() => {
                info!(account_id = %self.account_id, policy_arn = %policy_arn, "{e}; ignoring");
                Ok(())
            }
            Err(e) => Err(ReconcileError::internal(
                ResourceKind::Policy,
                policy_arn.to_string(),
                "unexpected error deleting policy",
                e,
            )),
        }
    }
}
