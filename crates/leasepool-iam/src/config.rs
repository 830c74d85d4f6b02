//! Principal configuration parsed from environment variables.

use std::env;

use leasepool_core::{Account, Arn, CoreResult};
use serde_json::{json, Value};
use thiserror::Error;

use crate::client::Tag;
use crate::spec::{HashSlot, PolicySpec, PrincipalSpec, RoleSpec};
use crate::template::{TemplateLocation, TemplateVariables};

const DEFAULT_ROLE_DESCRIPTION: &str = "Role for principal users of a leased sandbox account";
const DEFAULT_POLICY_DESCRIPTION: &str = "Policy for principal users of a leased sandbox account";
const DEFAULT_POLICY_KEY: &str = "fixtures/policies/principal_policy.tmpl";
const DEFAULT_TRUST_POLICY_KEY: &str = "fixtures/policies/principal_trust.tmpl";
const DEFAULT_MAX_SESSION_DURATION: i32 = 3600;
const MIN_SESSION_DURATION: i32 = 3600;
const MAX_SESSION_DURATION: i32 = 43200;

/// Error while reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing required environment variable {variable}")]
    Missing { variable: &'static str },

    /// A variable is set but unusable.
    #[error("invalid value for {variable}: {message}")]
    Invalid {
        variable: &'static str,
        message: String,
    },
}

/// An extra role/policy pair reconciled next to the primary principal.
///
/// Its policy template is stored at `<policy_name>.tmpl` in the artifacts
/// bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryPrincipal {
    pub role_name: String,
    pub policy_name: String,
}

impl AuxiliaryPrincipal {
    #[must_use]
    pub fn template_key(&self) -> String {
        format!("{}.tmpl", self.policy_name)
    }
}

/// Settings shared by every principal this deployment manages.
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalConfig {
    pub role_description: String,
    pub policy_description: String,
    /// Maximum session duration in seconds.
    pub max_session_duration: i32,
    pub iam_deny_tags: Vec<String>,
    pub allowed_regions: Vec<String>,
    pub artifacts_bucket: String,
    pub policy_key: String,
    pub trust_policy_key: String,
    /// Account whose identities may assume principal roles.
    pub trusted_account_id: String,
    pub tags: Vec<Tag>,
    pub auxiliary: Vec<AuxiliaryPrincipal>,
}

impl PrincipalConfig {
    /// Parse configuration from environment variables.
    ///
    /// Reads:
    /// - `ARTIFACTS_BUCKET`, `PRINCIPAL_TRUSTED_ACCOUNT_ID` (required)
    /// - `PRINCIPAL_ROLE_DESCRIPTION`, `PRINCIPAL_POLICY_DESCRIPTION`
    /// - `PRINCIPAL_MAX_SESSION_DURATION` (seconds, 3600-43200)
    /// - `PRINCIPAL_IAM_DENY_TAGS`, `ALLOWED_REGIONS` (comma lists)
    /// - `PRINCIPAL_POLICY_S3_KEY`, `PRINCIPAL_TRUST_POLICY_S3_KEY`
    /// - `PRINCIPAL_TAGS` (`key=value` comma list)
    /// - `AUXILIARY_PRINCIPALS` (`role:policy` comma list)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Parse configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing { variable: name });

        let max_session_duration = match get("PRINCIPAL_MAX_SESSION_DURATION") {
            Some(raw) => parse_session_duration(&raw)?,
            None => DEFAULT_MAX_SESSION_DURATION,
        };

        Ok(Self {
            role_description: get("PRINCIPAL_ROLE_DESCRIPTION")
                .unwrap_or_else(|| DEFAULT_ROLE_DESCRIPTION.to_string()),
            policy_description: get("PRINCIPAL_POLICY_DESCRIPTION")
                .unwrap_or_else(|| DEFAULT_POLICY_DESCRIPTION.to_string()),
            max_session_duration,
            iam_deny_tags: split_list(get("PRINCIPAL_IAM_DENY_TAGS")),
            allowed_regions: split_list(get("ALLOWED_REGIONS")),
            artifacts_bucket: required("ARTIFACTS_BUCKET")?,
            policy_key: get("PRINCIPAL_POLICY_S3_KEY")
                .unwrap_or_else(|| DEFAULT_POLICY_KEY.to_string()),
            trust_policy_key: get("PRINCIPAL_TRUST_POLICY_S3_KEY")
                .unwrap_or_else(|| DEFAULT_TRUST_POLICY_KEY.to_string()),
            trusted_account_id: required("PRINCIPAL_TRUSTED_ACCOUNT_ID")?,
            tags: parse_tags(get("PRINCIPAL_TAGS"))?,
            auxiliary: parse_auxiliary(get("AUXILIARY_PRINCIPALS"))?,
        })
    }

    /// Build the primary pair followed by every auxiliary pair for
    /// `account`.
    pub fn principal_specs(&self, account: &Account) -> CoreResult<Vec<PrincipalSpec>> {
        let trust_policy = TemplateLocation::new(&self.artifacts_bucket, &self.trust_policy_key);
        let base = self.base_variables(account);

        let mut specs = Vec::with_capacity(1 + self.auxiliary.len());
        specs.push(PrincipalSpec {
            role: self.role_spec(account.principal_role_arn.clone(), trust_policy.clone()),
            policy: PolicySpec {
                arn: account.principal_policy_arn.clone(),
                template: TemplateLocation::new(&self.artifacts_bucket, &self.policy_key),
                variables: base.clone(),
                description: self.policy_description.clone(),
            },
            hash_slot: HashSlot::Primary,
        });

        for aux in &self.auxiliary {
            let role_arn = Arn::iam_role(&account.id, &aux.role_name)?;
            let policy_arn = Arn::iam_policy(&account.id, &aux.policy_name)?;

            let mut variables = base.clone();
            variables.insert("AuxiliaryRoleArn".to_string(), json!(role_arn.to_string()));
            variables.insert("AuxiliaryPolicyArn".to_string(), json!(policy_arn.to_string()));

            specs.push(PrincipalSpec {
                role: self.role_spec(role_arn, trust_policy.clone()),
                policy: PolicySpec {
                    arn: policy_arn,
                    template: TemplateLocation::new(&self.artifacts_bucket, aux.template_key()),
                    variables,
                    description: self.policy_description.clone(),
                },
                hash_slot: HashSlot::Auxiliary(aux.policy_name.clone()),
            });
        }

        Ok(specs)
    }

    fn role_spec(&self, arn: Arn, trust_policy: TemplateLocation) -> RoleSpec {
        RoleSpec {
            arn,
            trust_policy,
            description: self.role_description.clone(),
            max_session_duration: self.max_session_duration,
            tags: self.tags.clone(),
        }
    }

    fn base_variables(&self, account: &Account) -> TemplateVariables {
        let variables = json!({
            "AccountId": account.id.as_str(),
            "PrincipalPolicyArn": account.principal_policy_arn.to_string(),
            "PrincipalRoleArn": account.principal_role_arn.to_string(),
            "PrincipalIAMDenyTags": self.iam_deny_tags,
            "AdminRoleArn": account.admin_role_arn.to_string(),
            "Regions": self.allowed_regions,
            "TrustedAccountId": self.trusted_account_id,
        });
        match variables {
            Value::Object(map) => map,
            _ => TemplateVariables::new(),
        }
    }
}

fn split_list(raw: Option<String>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

fn parse_session_duration(raw: &str) -> Result<i32, ConfigError> {
    let seconds: i32 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
        variable: "PRINCIPAL_MAX_SESSION_DURATION",
        message: format!("'{raw}' is not a number of seconds"),
    })?;
    if !(MIN_SESSION_DURATION..=MAX_SESSION_DURATION).contains(&seconds) {
        return Err(ConfigError::Invalid {
            variable: "PRINCIPAL_MAX_SESSION_DURATION",
            message: format!(
                "{seconds} is outside {MIN_SESSION_DURATION}-{MAX_SESSION_DURATION} seconds"
            ),
        });
    }
    Ok(seconds)
}

fn parse_tags(raw: Option<String>) -> Result<Vec<Tag>, ConfigError> {
    split_list(raw)
        .into_iter()
        .map(|item| match item.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => Ok(Tag::new(key.trim(), value.trim())),
            _ => Err(ConfigError::Invalid {
                variable: "PRINCIPAL_TAGS",
                message: format!("expected key=value, got '{item}'"),
            }),
        })
        .collect()
}

fn parse_auxiliary(raw: Option<String>) -> Result<Vec<AuxiliaryPrincipal>, ConfigError> {
    split_list(raw)
        .into_iter()
        .map(|item| match item.split_once(':') {
            Some((role, policy)) if !role.trim().is_empty() && !policy.trim().is_empty() => {
                Ok(AuxiliaryPrincipal {
                    role_name: role.trim().to_string(),
                    policy_name: policy.trim().to_string(),
                })
            }
            _ => Err(ConfigError::Invalid {
                variable: "AUXILIARY_PRINCIPALS",
                message: format!("expected role:policy, got '{item}'"),
            }),
        })
        .collect()
}
