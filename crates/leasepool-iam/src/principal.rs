//! Principal reconciliation
//!
//! [`PrincipalReconciler`] converges every role/policy pair an account
//! carries: its primary principal and any auxiliary pairs from
//! configuration. Each pair runs role, then policy, then attachment.
//!
//! All documents are rendered before the first write, so a template
//! failure leaves the identity provider untouched.

use std::sync::Arc;

use leasepool_core::Account;
use tracing::{info, instrument};

use crate::attachment::AttachmentReconciler;
use crate::client::{IamApi, IamClientProvider};
use crate::config::PrincipalConfig;
use crate::error::{ReconcileError, ReconcileResult};
use crate::policy::PolicyReconciler;
use crate::role::RoleReconciler;
use crate::spec::PrincipalSpec;
use crate::template::{RenderedTemplate, TemplateStore};

/// Documents rendered for one pair.
#[derive(Debug, Clone)]
struct RenderedPair {
    trust_policy: RenderedTemplate,
    policy: RenderedTemplate,
}

/// Converges and tears down the principal identities of accounts.
///
/// Holds no per-account state; one instance serves concurrent
/// reconciliations of different accounts.
pub struct PrincipalReconciler {
    clients: Arc<dyn IamClientProvider>,
    templates: Arc<dyn TemplateStore>,
    config: Arc<PrincipalConfig>,
}

impl PrincipalReconciler {
    pub fn new(
        clients: Arc<dyn IamClientProvider>,
        templates: Arc<dyn TemplateStore>,
        config: Arc<PrincipalConfig>,
    ) -> Self {
        Self {
            clients,
            templates,
            config,
        }
    }

    /// The configuration the reconciler builds specifications from.
    #[must_use]
    pub fn config(&self) -> &PrincipalConfig {
        &self.config
    }

    /// Create or update every pair of `account`.
    ///
    /// Fingerprints are written to `account` as each pair's policy is
    /// confirmed, so on error the account still records the pairs that
    /// converged and the caller should persist it before retrying.
    #[instrument(skip(self, account), fields(account_id = %account.id))]
    pub async fn merge_principal(&self, account: &mut Account) -> ReconcileResult<()> {
        let specs = self.config.principal_specs(account)?;

        let mut rendered = Vec::with_capacity(specs.len());
        for spec in &specs {
            rendered.push(self.render_pair(spec).await?);
        }

        let iam = self.client_for(account).await?;
        for (spec, documents) in specs.iter().zip(&rendered) {
            self.merge_pair(iam.as_ref(), account, spec, documents)
                .await?;
        }

        info!(
            account_id = %account.id,
            pairs = specs.len(),
            "Principal reconciled"
        );
        Ok(())
    }

    /// Remove every pair of `account`, auxiliary pairs first, and forget
    /// their fingerprints.
    #[instrument(skip(self, account), fields(account_id = %account.id))]
    pub async fn delete_principal(&self, account: &mut Account) -> ReconcileResult<()> {
        let specs = self.config.principal_specs(account)?;
        let iam = self.client_for(account).await?;

        for spec in specs.iter().rev() {
            self.delete_pair(iam.as_ref(), account, spec).await?;
            spec.hash_slot.clear(account);
        }

        info!(account_id = %account.id, pairs = specs.len(), "Principal deleted");
        Ok(())
    }

    /// Converge a single pair on `account` with the given client.
    pub async fn merge_spec(
        &self,
        iam: &dyn IamApi,
        account: &mut Account,
        spec: &PrincipalSpec,
    ) -> ReconcileResult<()> {
        let documents = self.render_pair(spec).await?;
        self.merge_pair(iam, account, spec, &documents).await
    }

    async fn client_for(&self, account: &Account) -> ReconcileResult<Arc<dyn IamApi>> {
        self.clients
            .client_for(account)
            .await
            .map_err(|source| ReconcileError::ClientUnavailable {
                account_id: account.id.clone(),
                source,
            })
    }

    async fn render_pair(&self, spec: &PrincipalSpec) -> ReconcileResult<RenderedPair> {
        let trust_policy = self
            .templates
            .get_template_object(&spec.role.trust_policy, &spec.policy.variables)
            .await?;
        let policy = self
            .templates
            .get_template_object(&spec.policy.template, &spec.policy.variables)
            .await?;
        Ok(RenderedPair {
            trust_policy,
            policy,
        })
    }

    async fn merge_pair(
        &self,
        iam: &dyn IamApi,
        account: &mut Account,
        spec: &PrincipalSpec,
        documents: &RenderedPair,
    ) -> ReconcileResult<()> {
        let account_id = account.id.clone();

        RoleReconciler::new(iam, &account_id)
            .merge_role(&spec.role, &documents.trust_policy.document)
            .await?;

        let current_hash = spec.hash_slot.get(account).map(str::to_string);
        let new_hash = PolicyReconciler::new(iam, self.templates.as_ref(), &account_id)
            .apply(&spec.policy, &documents.policy, current_hash.as_deref())
            .await?;
        spec.hash_slot.set(account, new_hash);

        AttachmentReconciler::new(iam, &account_id)
            .attach(&spec.role.arn, &spec.policy.arn)
            .await
    }

    async fn delete_pair(
        &self,
        iam: &dyn IamApi,
        account: &Account,
        spec: &PrincipalSpec,
    ) -> ReconcileResult<()> {
        AttachmentReconciler::new(iam, &account.id)
            .detach(&spec.role.arn, &spec.policy.arn)
            .await?;
        PolicyReconciler::new(iam, self.templates.as_ref(), &account.id)
            .delete_policy(&spec.policy.arn)
            .await?;
        RoleReconciler::new(iam, &account.id)
            .delete_role(&spec.role.arn)
            .await
    }
}
