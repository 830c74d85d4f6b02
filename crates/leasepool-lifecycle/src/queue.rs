//! Reset work queue.

use async_trait::async_trait;
use leasepool_core::AccountId;
use serde::{Deserialize, Serialize};

use crate::error::QueueError;

/// One reset work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetMessage {
    pub account_id: AccountId,
}

impl ResetMessage {
    pub fn new(account_id: AccountId) -> Self {
        Self { account_id }
    }
}

/// Dispatches reset work items to the asynchronous reset worker.
#[async_trait]
pub trait ResetQueue: Send + Sync {
    async fn send_reset(&self, message: ResetMessage) -> Result<(), QueueError>;
}
