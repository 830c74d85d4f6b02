//! Pooled account records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::arn::Arn;
use crate::error::{CoreError, CoreResult};
use crate::ids::AccountId;

/// Lifecycle status of a pooled account.
///
/// ```text
/// Ready <──────> Leased
///   │  ▲            │
///   ▼  │            │
/// NotReady <────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountStatus {
    /// Clean and available for a new lease.
    Ready,
    /// Being reset; not available.
    NotReady,
    /// Granted to a consumer through an active lease.
    Leased,
}

impl AccountStatus {
    /// Whether the lifecycle permits moving from `self` to `next`.
    ///
    /// `NotReady -> NotReady` is allowed so that a reset can be requested
    /// again while an earlier one is still in flight.
    #[must_use]
    pub fn can_transition_to(self, next: AccountStatus) -> bool {
        use AccountStatus::{Leased, NotReady, Ready};
        matches!(
            (self, next),
            (Ready, Leased) | (Leased, Ready) | (_, NotReady) | (NotReady, Ready)
        )
    }

    /// Status as its wire string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AccountStatus::Ready => "Ready",
            AccountStatus::NotReady => "NotReady",
            AccountStatus::Leased => "Leased",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One managed cloud account.
///
/// `principal_policy_hash` is `None` until the principal policy has been
/// reconciled once, and afterwards holds the fingerprint of the document
/// last written as the default policy version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub status: AccountStatus,
    pub admin_role_arn: Arn,
    pub principal_role_arn: Arn,
    pub principal_policy_arn: Arn,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_policy_hash: Option<String>,
    /// Fingerprints of auxiliary policies, keyed by policy name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub auxiliary_policy_hashes: BTreeMap<String, String>,
    pub created_on: DateTime<Utc>,
    pub last_modified_on: DateTime<Utc>,
}

impl Account {
    /// Create a freshly registered account. New accounts start `NotReady`
    /// until their first reset completes.
    #[must_use]
    pub fn new(
        id: AccountId,
        admin_role_arn: Arn,
        principal_role_arn: Arn,
        principal_policy_arn: Arn,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            status: AccountStatus::NotReady,
            admin_role_arn,
            principal_role_arn,
            principal_policy_arn,
            principal_policy_hash: None,
            auxiliary_policy_hashes: BTreeMap::new(),
            created_on: now,
            last_modified_on: now,
        }
    }

    /// Move to `next`, stamping `last_modified_on`.
    pub fn transition_to(&mut self, next: AccountStatus, now: DateTime<Utc>) -> CoreResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.last_modified_on = now;
        Ok(())
    }
}
