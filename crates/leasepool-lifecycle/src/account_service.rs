//! Account status transitions.
//!
//! Reset only records the intent: the account moves to `NotReady`, is
//! saved, and a work item is queued for the reset worker. The principal
//! reconciliation itself runs later in [`crate::ResetProcessor`].

use std::sync::Arc;

use chrono::Utc;
use leasepool_core::{Account, AccountId, AccountStatus};
use tracing::{info, instrument, warn};

use crate::error::{LifecycleError, LifecycleResult};
use crate::queue::{ResetMessage, ResetQueue};
use crate::store::AccountStore;

/// Drives accounts through their lifecycle.
#[derive(Clone)]
pub struct AccountService {
    accounts: Arc<dyn AccountStore>,
    queue: Arc<dyn ResetQueue>,
}

impl AccountService {
    /// Create a new account service.
    #[must_use]
    pub fn new(accounts: Arc<dyn AccountStore>, queue: Arc<dyn ResetQueue>) -> Self {
        Self { accounts, queue }
    }

    /// Mark the account `NotReady`, save it and queue one reset.
    ///
    /// The record is saved before the message is sent. If sending fails
    /// the account stays `NotReady` and the reset can be requested again.
    #[instrument(skip(self), fields(account_id = %id))]
    pub async fn reset(&self, id: &AccountId) -> LifecycleResult<Account> {
        let mut account = self.load(id).await?;

        account.transition_to(AccountStatus::NotReady, Utc::now())?;
        self.accounts.put_account(&account).await?;

        if let Err(e) = self.queue.send_reset(ResetMessage::new(id.clone())).await {
            warn!(account_id = %id, error = %e, "Account saved as NotReady but reset was not queued");
            return Err(e.into());
        }

        info!(account_id = %id, "Account reset queued");
        Ok(account)
    }

    /// Return a reset account to the pool.
    #[instrument(skip(self), fields(account_id = %id))]
    pub async fn mark_ready(&self, id: &AccountId) -> LifecycleResult<Account> {
        let mut account = self.load(id).await?;

        if account.status != AccountStatus::NotReady {
            return Err(LifecycleError::InvalidTransition {
                from: account.status.to_string(),
                to: AccountStatus::Ready.to_string(),
            });
        }
        account.transition_to(AccountStatus::Ready, Utc::now())?;
        self.accounts.put_account(&account).await?;

        info!(account_id = %id, "Account ready");
        Ok(account)
    }

    async fn load(&self, id: &AccountId) -> LifecycleResult<Account> {
        self.accounts
            .get_account(id)
            .await?
            .ok_or_else(|| LifecycleError::not_found("account", id))
    }
}
