//! Desired-state specifications
//!
//! A [`PrincipalSpec`] names one role/policy pair and everything needed
//! to converge it. The account's primary principal and every auxiliary
//! pair are described the same way and reconciled by the same code.

use leasepool_core::{Account, Arn};

use crate::client::Tag;
use crate::template::{TemplateLocation, TemplateVariables};

/// Desired state of a role.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleSpec {
    pub arn: Arn,
    pub trust_policy: TemplateLocation,
    pub description: String,
    /// Maximum session duration in seconds.
    pub max_session_duration: i32,
    pub tags: Vec<Tag>,
}

impl RoleSpec {
    /// Short role name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.arn.resource_name()
    }
}

/// Desired state of a managed policy.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicySpec {
    pub arn: Arn,
    pub template: TemplateLocation,
    pub variables: TemplateVariables,
    pub description: String,
}

impl PolicySpec {
    /// Short policy name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.arn.resource_name()
    }
}

/// Where the fingerprint of a pair's policy is kept on the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashSlot {
    /// `Account::principal_policy_hash`.
    Primary,
    /// `Account::auxiliary_policy_hashes[name]`.
    Auxiliary(String),
}

impl HashSlot {
    /// Read the stored fingerprint.
    #[must_use]
    pub fn get<'a>(&self, account: &'a Account) -> Option<&'a str> {
        match self {
            HashSlot::Primary => account.principal_policy_hash.as_deref(),
            HashSlot::Auxiliary(name) => account.auxiliary_policy_hashes.get(name).map(String::as_str),
        }
    }

    /// Store a fingerprint.
    pub fn set(&self, account: &mut Account, hash: String) {
        match self {
            HashSlot::Primary => account.principal_policy_hash = Some(hash),
            HashSlot::Auxiliary(name) => {
                account.auxiliary_policy_hashes.insert(name.clone(), hash);
            }
        }
    }

    /// Forget the stored fingerprint.
    pub fn clear(&self, account: &mut Account) {
        match self {
            HashSlot::Primary => account.principal_policy_hash = None,
            HashSlot::Auxiliary(name) => {
                account.auxiliary_policy_hashes.remove(name);
            }
        }
    }
}

/// One role/policy pair to converge.
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalSpec {
    pub role: RoleSpec,
    pub policy: PolicySpec,
    pub hash_slot: HashSlot,
}
