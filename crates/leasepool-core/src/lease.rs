//! Lease records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, LeaseId};

/// Whether a lease currently grants its account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeaseStatus {
    Active,
    Inactive,
}

/// Why a lease is in its current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeaseStatusReason {
    Active,
    Expired,
    OverBudget,
    Destroyed,
    Rollback,
}

/// A time-bounded grant of one account to a consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lease {
    pub id: LeaseId,
    pub account_id: AccountId,
    pub principal_id: String,
    pub status: LeaseStatus,
    pub status_reason: LeaseStatusReason,
    pub budget_amount: f64,
    pub budget_currency: String,
    #[serde(default)]
    pub budget_notification_emails: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<DateTime<Utc>>,
    pub created_on: DateTime<Utc>,
    pub last_modified_on: DateTime<Utc>,
    pub status_modified_on: DateTime<Utc>,
}
