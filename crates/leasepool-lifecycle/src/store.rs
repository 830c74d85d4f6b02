//! Record store collaborators.

use async_trait::async_trait;
use leasepool_core::{Account, AccountId, Lease, LeaseId};

use crate::error::StoreError;

/// Loads and saves account records.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Load an account; `None` when it does not exist.
    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, StoreError>;

    /// Save an account, replacing any previous record.
    async fn put_account(&self, account: &Account) -> Result<(), StoreError>;
}

/// Loads and saves lease records.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    async fn get_lease(&self, id: &LeaseId) -> Result<Option<Lease>, StoreError>;

    async fn put_lease(&self, lease: &Lease) -> Result<(), StoreError>;
}
