//! Reset work item processing.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use leasepool_core::{Account, AccountStatus};
use leasepool_iam::principal::PrincipalReconciler;
use tracing::{error, info, instrument, warn};

use crate::config::ResetConfig;
use crate::error::{LifecycleError, LifecycleResult};
use crate::queue::ResetMessage;
use crate::store::AccountStore;

/// Consumes reset work items: reconciles the account's principal and saves
/// the result.
///
/// A failed reconciliation returns the error so the queue consumer can
/// retry the message. Fingerprints of pairs that converged before the
/// failure are still saved, so the retry skips their policy writes; the
/// status is left alone.
pub struct ResetProcessor {
    accounts: Arc<dyn AccountStore>,
    reconciler: Arc<PrincipalReconciler>,
    config: ResetConfig,
}

impl ResetProcessor {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        reconciler: Arc<PrincipalReconciler>,
        config: ResetConfig,
    ) -> Self {
        Self {
            accounts,
            reconciler,
            config,
        }
    }

    /// Process one reset work item.
    #[instrument(skip(self, message), fields(account_id = %message.account_id))]
    pub async fn process(&self, message: ResetMessage) -> LifecycleResult<Account> {
        let mut account = self
            .accounts
            .get_account(&message.account_id)
            .await?
            .ok_or_else(|| LifecycleError::not_found("account", &message.account_id))?;
        let previous = Fingerprints::of(&account);

        if let Err(e) = self.reconciler.merge_principal(&mut account).await {
            error!(
                account_id = %message.account_id,
                error = %e,
                error_code = e.error_code(),
                "Principal reconciliation failed"
            );
            if Fingerprints::of(&account) != previous {
                if let Err(store_err) = self.accounts.put_account(&account).await {
                    warn!(
                        account_id = %message.account_id,
                        error = %store_err,
                        "Could not save fingerprints of converged pairs"
                    );
                }
            }
            return Err(e.into());
        }

        if self.config.mark_ready && account.status == AccountStatus::NotReady {
            account.transition_to(AccountStatus::Ready, Utc::now())?;
        }
        self.accounts.put_account(&account).await?;

        info!(
            account_id = %account.id,
            status = %account.status,
            "Account reset processed"
        );
        Ok(account)
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Fingerprints {
    primary: Option<String>,
    auxiliary: BTreeMap<String, String>,
}

impl Fingerprints {
    fn of(account: &Account) -> Self {
        Self {
            primary: account.principal_policy_hash.clone(),
            auxiliary: account.auxiliary_policy_hashes.clone(),
        }
    }
}
