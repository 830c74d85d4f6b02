//! Resource names
//!
//! [`Arn`] is the canonical name of an identity-provider object
//! (`arn:<partition>:<service>:<region>:<account>:<resource>`). IAM
//! resources carry an empty region and a `<type>/<path>/<name>` resource
//! part; [`Arn::resource_name`] projects the short name the IAM API expects
//! for role-addressed calls.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};

const DEFAULT_PARTITION: &str = "aws";
const IAM_SERVICE: &str = "iam";
const MAX_ROLE_NAME_LEN: usize = 64;
const MAX_POLICY_NAME_LEN: usize = 128;

/// Canonical resource name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Arn {
    partition: String,
    service: String,
    region: String,
    account: String,
    resource: String,
}

impl Arn {
    /// Build the name of an IAM role in `account`.
    pub fn iam_role(account: impl AsRef<str>, name: &str) -> CoreResult<Self> {
        validate_iam_name(name, MAX_ROLE_NAME_LEN)?;
        Self::iam(account.as_ref(), format!("role/{name}"))
    }

    /// Build the name of a customer-managed IAM policy in `account`.
    pub fn iam_policy(account: impl AsRef<str>, name: &str) -> CoreResult<Self> {
        validate_iam_name(name, MAX_POLICY_NAME_LEN)?;
        Self::iam(account.as_ref(), format!("policy/{name}"))
    }

    fn iam(account: &str, resource: String) -> CoreResult<Self> {
        if account.is_empty() || account.contains(':') {
            return Err(CoreError::invalid_arn(
                account,
                "account component must be non-empty and contain no ':'",
            ));
        }
        Ok(Self {
            partition: DEFAULT_PARTITION.to_string(),
            service: IAM_SERVICE.to_string(),
            region: String::new(),
            account: account.to_string(),
            resource,
        })
    }

    /// Parse a canonical resource name.
    pub fn parse(value: &str) -> CoreResult<Self> {
        let mut parts = value.splitn(6, ':');
        let prefix = parts.next().unwrap_or_default();
        if prefix != "arn" {
            return Err(CoreError::invalid_arn(value, "must start with 'arn:'"));
        }

        let (Some(partition), Some(service), Some(region), Some(account), Some(resource)) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(CoreError::invalid_arn(value, "expected six ':'-separated parts"));
        };

        if partition.is_empty() || service.is_empty() {
            return Err(CoreError::invalid_arn(value, "partition and service are required"));
        }
        if resource.is_empty() {
            return Err(CoreError::invalid_arn(value, "resource is required"));
        }
        if resource.ends_with('/') {
            return Err(CoreError::invalid_arn(value, "resource name is empty"));
        }

        Ok(Self {
            partition: partition.to_string(),
            service: service.to_string(),
            region: region.to_string(),
            account: account.to_string(),
            resource: resource.to_string(),
        })
    }

    /// The partition (`aws`, `aws-us-gov`, ...).
    #[must_use]
    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// The owning service.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// The owning account component.
    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    /// The full resource part, including type and path.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// The resource type (`role`, `policy`), if the resource is typed.
    #[must_use]
    pub fn resource_type(&self) -> Option<&str> {
        self.resource.split_once('/').map(|(kind, _)| kind)
    }

    /// The short resource name: the last `/` segment of the resource part.
    #[must_use]
    pub fn resource_name(&self) -> &str {
        self.resource
            .rsplit('/')
            .next()
            .unwrap_or(self.resource.as_str())
    }
}

fn validate_iam_name(name: &str, max_len: usize) -> CoreResult<()> {
    if name.is_empty() || name.len() > max_len {
        return Err(CoreError::invalid_arn(
            name,
            format!("name must be 1-{max_len} characters"),
        ));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || "+=,.@_-".contains(c);
    if !name.chars().all(allowed) {
        return Err(CoreError::invalid_arn(
            name,
            "name may only contain alphanumerics and '+=,.@_-'",
        ));
    }
    Ok(())
}

impl fmt::Display for Arn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arn:{}:{}:{}:{}:{}",
            self.partition, self.service, self.region, self.account, self.resource
        )
    }
}

impl FromStr for Arn {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Arn {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Arn> for String {
    fn from(arn: Arn) -> Self {
        arn.to_string()
    }
}
