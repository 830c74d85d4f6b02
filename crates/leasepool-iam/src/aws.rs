//! AWS IAM implementation of [`IamApi`].
//!
//! Uses the official aws-sdk-iam crate. Error codes `EntityAlreadyExists`
//! and `NoSuchEntity` map onto the matching [`IamError`] categories;
//! everything else is `IamError::Other` carrying the SDK error.

use async_trait::async_trait;
use aws_sdk_iam::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_iam::types::Tag as AwsTag;
use chrono::{DateTime, Utc};
use leasepool_core::Arn;

use crate::client::{CreatePolicyRequest, CreateRoleRequest, IamApi, PolicyVersion};
use crate::error::{IamError, IamResult};

/// [`IamApi`] over an `aws_sdk_iam::Client`.
#[derive(Debug, Clone)]
pub struct AwsIamClient {
    client: aws_sdk_iam::Client,
}

impl AwsIamClient {
    pub fn new(client: aws_sdk_iam::Client) -> Self {
        Self { client }
    }

    /// Build a client from the ambient AWS configuration.
    pub async fn from_env() -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        tracing::info!(
            region = ?sdk_config.region(),
            "AWS IAM client initialized"
        );
        Self::new(aws_sdk_iam::Client::new(&sdk_config))
    }
}

fn classify<E, R>(err: SdkError<E, R>) -> IamError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let message = err.message().unwrap_or("no message").to_string();
    match err.code() {
        Some("EntityAlreadyExists") => IamError::AlreadyExists { message },
        Some("NoSuchEntity") => IamError::NoSuchEntity { message },
        _ => IamError::Other {
            message: DisplayErrorContext(&err).to_string(),
            source: Some(Box::new(err)),
        },
    }
}

fn to_policy_version(version: &aws_sdk_iam::types::PolicyVersion) -> IamResult<PolicyVersion> {
    let version_id = version
        .version_id()
        .ok_or_else(|| IamError::other("policy version without an id"))?
        .to_string();
    let created_at = version
        .create_date()
        .and_then(|d| DateTime::<Utc>::from_timestamp(d.secs(), d.subsec_nanos()))
        .ok_or_else(|| IamError::other(format!("policy version {version_id} without a creation date")))?;
    Ok(PolicyVersion {
        version_id,
        is_default: version.is_default_version(),
        created_at,
    })
}

#[async_trait]
impl IamApi for AwsIamClient {
    async fn create_role(&self, request: CreateRoleRequest) -> IamResult<()> {
        let tags = request
            .tags
            .into_iter()
            .map(|t| AwsTag::builder().key(t.key).value(t.value).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| IamError::other_with_source("invalid role tag", e))?;

        self.client
            .create_role()
            .role_name(request.role_name)
            .assume_role_policy_document(request.assume_role_policy_document)
            .description(request.description)
            .max_session_duration(request.max_session_duration)
            .set_tags(Some(tags))
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn delete_role(&self, role_name: &str) -> IamResult<()> {
        self.client
            .delete_role()
            .role_name(role_name)
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn create_policy(&self, request: CreatePolicyRequest) -> IamResult<()> {
        self.client
            .create_policy()
            .policy_name(request.policy_name)
            .description(request.description)
            .policy_document(request.policy_document)
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn delete_policy(&self, policy_arn: &Arn) -> IamResult<()> {
        self.client
            .delete_policy()
            .policy_arn(policy_arn.to_string())
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn create_policy_version(
        &self,
        policy_arn: &Arn,
        document: &str,
        set_as_default: bool,
    ) -> IamResult<()> {
        self.client
            .create_policy_version()
            .policy_arn(policy_arn.to_string())
            .policy_document(document)
            .set_as_default(set_as_default)
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn delete_policy_version(&self, policy_arn: &Arn, version_id: &str) -> IamResult<()> {
        self.client
            .delete_policy_version()
            .policy_arn(policy_arn.to_string())
            .version_id(version_id)
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn list_policy_versions(&self, policy_arn: &Arn) -> IamResult<Vec<PolicyVersion>> {
        let mut versions = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let page = self
                .client
                .list_policy_versions()
                .policy_arn(policy_arn.to_string())
                .set_marker(marker.take())
                .send()
                .await
                .map_err(classify)?;

            for version in page.versions() {
                versions.push(to_policy_version(version)?);
            }

            match page.marker() {
                Some(next) if page.is_truncated() => marker = Some(next.to_string()),
                _ => break,
            }
        }

        Ok(versions)
    }

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &Arn) -> IamResult<()> {
        self.client
            .attach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn.to_string())
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn detach_role_policy(&self, role_name: &str, policy_arn: &Arn) -> IamResult<()> {
        self.client
            .detach_role_policy()
            .role_name(role_name)
            .policy_arn(policy_arn.to_string())
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }
}
