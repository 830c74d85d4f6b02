//! Shared fixtures for the reconciliation integration tests.
//!
//! [`FakeIam`] is a stateful in-memory identity provider that follows the
//! real service's rules closely enough for the reconcilers to be
//! exercised end to end: duplicate creates report already-exists, deletes
//! of missing entities report no-such-entity, the version history is
//! capped at five and the default version cannot be deleted.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use leasepool_core::{Account, AccountId, Arn};
use leasepool_iam::prelude::*;

static INIT: Once = Once::new();

/// Initialize logging for tests (once).
pub fn init_test_logging() {
    INIT.call_once(|| {
        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

pub const ACCOUNT_ID: &str = "123456789012";
pub const BUCKET: &str = "artifacts";
pub const POLICY_KEY: &str = "fixtures/policies/principal_policy.tmpl";
pub const TRUST_KEY: &str = "fixtures/policies/principal_trust.tmpl";

pub const POLICY_TEMPLATE: &str = r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Action":"*","Resource":"*","Condition":{"StringEquals":{"aws:RequestedRegion":[{{#each Regions}}"{{this}}"{{#unless @last}},{{/unless}}{{/each}}]}}},{"Effect":"Deny","Action":"iam:*","Resource":["{{PrincipalRoleArn}}","{{PrincipalPolicyArn}}","{{AdminRoleArn}}"]}]}"#;
pub const TRUST_TEMPLATE: &str = r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Principal":{"AWS":"arn:aws:iam::{{TrustedAccountId}}:root"},"Action":"sts:AssumeRole"}]}"#;
pub const AUX_TEMPLATE: &str = r#"{"Version":"2012-10-17","Statement":[{"Effect":"Allow","Action":"cloudtrail:LookupEvents","Resource":"*","Sid":"{{AuxiliaryRoleArn}}"}]}"#;

/// Identity-provider operations, for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    CreateRole,
    DeleteRole,
    CreatePolicy,
    DeletePolicy,
    CreatePolicyVersion,
    DeletePolicyVersion,
    ListPolicyVersions,
    AttachRolePolicy,
    DetachRolePolicy,
}

impl Op {
    pub fn is_write(self) -> bool {
        self != Op::ListPolicyVersions
    }
}

/// Failure to inject for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    AlreadyExists,
    NoSuchEntity,
    Other,
}

impl Failure {
    fn into_error(self, op: Op) -> IamError {
        match self {
            Failure::AlreadyExists => IamError::already_exists(format!("{op:?}")),
            Failure::NoSuchEntity => IamError::no_such_entity(format!("{op:?}")),
            Failure::Other => IamError::other(format!("{op:?} failed: service unavailable")),
        }
    }
}

/// A recorded identity-provider call: operation plus its main argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: Op,
    pub target: String,
}

#[derive(Debug, Clone)]
pub struct StoredVersion {
    pub version: PolicyVersion,
    pub document: String,
}

#[derive(Debug, Default)]
struct State {
    roles: HashMap<String, CreateRoleRequest>,
    policies: HashMap<String, Vec<StoredVersion>>,
    next_version: HashMap<String, u32>,
    attachments: HashSet<(String, String)>,
    tick: i64,
}

impl State {
    fn now(&mut self) -> DateTime<Utc> {
        self.tick += 1;
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(self.tick)
    }

    fn add_version(&mut self, arn: &str, document: &str, is_default: bool) -> String {
        let number = self.next_version.entry(arn.to_string()).or_insert(0);
        *number += 1;
        let version_id = format!("v{number}");
        let created_at = self.now();
        let versions = self.policies.entry(arn.to_string()).or_default();
        if is_default {
            for v in versions.iter_mut() {
                v.version.is_default = false;
            }
        }
        versions.push(StoredVersion {
            version: PolicyVersion {
                version_id: version_id.clone(),
                is_default,
                created_at,
            },
            document: document.to_string(),
        });
        version_id
    }
}

/// Stateful in-memory identity provider.
pub struct FakeIam {
    account: String,
    state: Mutex<State>,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<Op, Failure>>,
}

impl FakeIam {
    pub fn new(account: &str) -> Self {
        Self {
            account: account.to_string(),
            state: Mutex::new(State::default()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Make every call of `op` fail with `failure` until cleared.
    pub fn fail(&self, op: Op, failure: Failure) {
        self.failures.lock().unwrap().insert(op, failure);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn ops(&self) -> Vec<Op> {
        self.calls().into_iter().map(|c| c.op).collect()
    }

    pub fn count(&self, op: Op) -> usize {
        self.calls().iter().filter(|c| c.op == op).count()
    }

    pub fn write_count(&self) -> usize {
        self.calls().iter().filter(|c| c.op.is_write()).count()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Create a policy whose history is `count` versions, the last default.
    pub fn seed_policy(&self, arn: &Arn, count: usize) {
        let mut state = self.state.lock().unwrap();
        for i in 0..count {
            state.add_version(&arn.to_string(), &format!("{{\"seed\":{i}}}"), i + 1 == count);
        }
    }

    /// Replace a policy's history with exactly `versions`.
    pub fn seed_versions(&self, arn: &Arn, versions: Vec<PolicyVersion>) {
        let mut state = self.state.lock().unwrap();
        let stored = versions
            .into_iter()
            .map(|version| StoredVersion {
                version,
                document: "{}".to_string(),
            })
            .collect();
        state.policies.insert(arn.to_string(), stored);
    }

    pub fn seed_role(&self, name: &str) {
        self.state.lock().unwrap().roles.insert(
            name.to_string(),
            CreateRoleRequest {
                role_name: name.to_string(),
                assume_role_policy_document: "{}".to_string(),
                description: String::new(),
                max_session_duration: 3600,
                tags: vec![],
            },
        );
    }

    pub fn role(&self, name: &str) -> Option<CreateRoleRequest> {
        self.state.lock().unwrap().roles.get(name).cloned()
    }

    pub fn versions(&self, arn: &Arn) -> Option<Vec<StoredVersion>> {
        self.state.lock().unwrap().policies.get(&arn.to_string()).cloned()
    }

    pub fn default_document(&self, arn: &Arn) -> Option<String> {
        self.versions(arn)?
            .into_iter()
            .find(|v| v.version.is_default)
            .map(|v| v.document)
    }

    pub fn is_attached(&self, role_name: &str, arn: &Arn) -> bool {
        self.state
            .lock()
            .unwrap()
            .attachments
            .contains(&(role_name.to_string(), arn.to_string()))
    }

    fn record(&self, op: Op, target: impl Into<String>) -> IamResult<()> {
        self.calls.lock().unwrap().push(Call {
            op,
            target: target.into(),
        });
        match self.failures.lock().unwrap().get(&op) {
            Some(failure) => Err(failure.into_error(op)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl IamApi for FakeIam {
    async fn create_role(&self, request: CreateRoleRequest) -> IamResult<()> {
        self.record(Op::CreateRole, &request.role_name)?;
        let mut state = self.state.lock().unwrap();
        if state.roles.contains_key(&request.role_name) {
            return Err(IamError::already_exists(format!(
                "Role with name {} already exists",
                request.role_name
            )));
        }
        state.roles.insert(request.role_name.clone(), request);
        Ok(())
    }

    async fn delete_role(&self, role_name: &str) -> IamResult<()> {
        self.record(Op::DeleteRole, role_name)?;
        let mut state = self.state.lock().unwrap();
        if !state.roles.contains_key(role_name) {
            return Err(IamError::no_such_entity(format!(
                "The role with name {role_name} cannot be found"
            )));
        }
        if state.attachments.iter().any(|(role, _)| role == role_name) {
            return Err(IamError::other("DeleteConflict: role has attached policies"));
        }
        state.roles.remove(role_name);
        Ok(())
    }

    async fn create_policy(&self, request: CreatePolicyRequest) -> IamResult<()> {
        self.record(Op::CreatePolicy, &request.policy_name)?;
        let arn = Arn::iam_policy(&self.account, &request.policy_name)
            .map_err(|e| IamError::other(e.to_string()))?
            .to_string();
        let mut state = self.state.lock().unwrap();
        if state.policies.contains_key(&arn) {
            return Err(IamError::already_exists(format!(
                "A policy called {} already exists",
                request.policy_name
            )));
        }
        state.add_version(&arn, &request.policy_document, true);
        Ok(())
    }

    async fn delete_policy(&self, policy_arn: &Arn) -> IamResult<()> {
        self.record(Op::DeletePolicy, policy_arn.to_string())?;
        let arn = policy_arn.to_string();
        let mut state = self.state.lock().unwrap();
        let Some(versions) = state.policies.get(&arn) else {
            return Err(IamError::no_such_entity(format!("Policy {arn} does not exist")));
        };
        if versions.iter().any(|v| !v.version.is_default) {
            return Err(IamError::other("DeleteConflict: policy has non-default versions"));
        }
        if state.attachments.iter().any(|(_, a)| *a == arn) {
            return Err(IamError::other("DeleteConflict: policy is attached"));
        }
        state.policies.remove(&arn);
        Ok(())
    }

    async fn create_policy_version(
        &self,
        policy_arn: &Arn,
        document: &str,
        set_as_default: bool,
    ) -> IamResult<()> {
        self.record(Op::CreatePolicyVersion, policy_arn.to_string())?;
        let arn = policy_arn.to_string();
        let mut state = self.state.lock().unwrap();
        let Some(versions) = state.policies.get(&arn) else {
            return Err(IamError::no_such_entity(format!("Policy {arn} does not exist")));
        };
        if versions.len() >= MAX_POLICY_VERSIONS {
            return Err(IamError::other(
                "LimitExceeded: cannot exceed quota for PolicyVersionsPerPolicy: 5",
            ));
        }
        state.add_version(&arn, document, set_as_default);
        Ok(())
    }

    async fn delete_policy_version(&self, policy_arn: &Arn, version_id: &str) -> IamResult<()> {
        self.record(
            Op::DeletePolicyVersion,
            format!("{policy_arn}:{version_id}"),
        )?;
        let arn = policy_arn.to_string();
        let mut state = self.state.lock().unwrap();
        let Some(versions) = state.policies.get_mut(&arn) else {
            return Err(IamError::no_such_entity(format!("Policy {arn} does not exist")));
        };
        let Some(index) = versions
            .iter()
            .position(|v| v.version.version_id == version_id)
        else {
            return Err(IamError::no_such_entity(format!(
                "Policy {arn} version {version_id} does not exist"
            )));
        };
        if versions[index].version.is_default {
            return Err(IamError::other(
                "DeleteConflict: cannot delete the default version",
            ));
        }
        versions.remove(index);
        Ok(())
    }

    async fn list_policy_versions(&self, policy_arn: &Arn) -> IamResult<Vec<PolicyVersion>> {
        self.record(Op::ListPolicyVersions, policy_arn.to_string())?;
        let state = self.state.lock().unwrap();
        state
            .policies
            .get(&policy_arn.to_string())
            .map(|versions| versions.iter().map(|v| v.version.clone()).collect())
            .ok_or_else(|| IamError::no_such_entity(format!("Policy {policy_arn} does not exist")))
    }

    async fn attach_role_policy(&self, role_name: &str, policy_arn: &Arn) -> IamResult<()> {
        self.record(Op::AttachRolePolicy, format!("{role_name}:{policy_arn}"))?;
        let mut state = self.state.lock().unwrap();
        if !state.roles.contains_key(role_name) || !state.policies.contains_key(&policy_arn.to_string()) {
            return Err(IamError::no_such_entity("role or policy does not exist"));
        }
        state
            .attachments
            .insert((role_name.to_string(), policy_arn.to_string()));
        Ok(())
    }

    async fn detach_role_policy(&self, role_name: &str, policy_arn: &Arn) -> IamResult<()> {
        self.record(Op::DetachRolePolicy, format!("{role_name}:{policy_arn}"))?;
        let mut state = self.state.lock().unwrap();
        if !state
            .attachments
            .remove(&(role_name.to_string(), policy_arn.to_string()))
        {
            return Err(IamError::no_such_entity(format!(
                "Policy {policy_arn} was not found attached to {role_name}"
            )));
        }
        Ok(())
    }
}

/// Provider handing out one shared [`FakeIam`].
pub struct FakeClients {
    pub iam: Arc<FakeIam>,
    pub unavailable: bool,
}

#[async_trait]
impl IamClientProvider for FakeClients {
    async fn client_for(&self, _account: &Account) -> IamResult<Arc<dyn IamApi>> {
        if self.unavailable {
            return Err(IamError::other("AccessDenied: cannot assume admin role"));
        }
        Ok(self.iam.clone() as Arc<dyn IamApi>)
    }
}

pub fn account_id() -> AccountId {
    AccountId::new(ACCOUNT_ID).unwrap()
}

pub fn account() -> Account {
    let id = account_id();
    Account::new(
        id.clone(),
        Arn::iam_role(&id, "AdminRole").unwrap(),
        Arn::iam_role(&id, "LeasepoolPrincipal").unwrap(),
        Arn::iam_policy(&id, "LeasepoolPrincipalDefaultPolicy").unwrap(),
        Utc::now(),
    )
}

pub fn config(auxiliary: &str) -> PrincipalConfig {
    let vars: HashMap<&str, String> = [
        ("ARTIFACTS_BUCKET", BUCKET.to_string()),
        ("PRINCIPAL_TRUSTED_ACCOUNT_ID", "000000000000".to_string()),
        ("ALLOWED_REGIONS", "us-east-1,us-west-2".to_string()),
        ("PRINCIPAL_TAGS", "AppName=Leasepool".to_string()),
        ("AUXILIARY_PRINCIPALS", auxiliary.to_string()),
    ]
    .into_iter()
    .collect();
    PrincipalConfig::from_lookup(|name| vars.get(name).cloned()).unwrap()
}

pub fn template_source() -> MemoryTemplateSource {
    MemoryTemplateSource::new()
        .with_template(TemplateLocation::new(BUCKET, POLICY_KEY), POLICY_TEMPLATE)
        .with_template(TemplateLocation::new(BUCKET, TRUST_KEY), TRUST_TEMPLATE)
        .with_template(TemplateLocation::new(BUCKET, "AuditPolicy.tmpl"), AUX_TEMPLATE)
}

pub fn templates() -> HandlebarsTemplateStore<MemoryTemplateSource> {
    HandlebarsTemplateStore::new(template_source())
}

/// The primary principal's policy specification for [`account`].
pub fn policy_spec() -> PolicySpec {
    config("")
        .principal_specs(&account())
        .unwrap()
        .remove(0)
        .policy
}

pub fn role_spec() -> RoleSpec {
    config("")
        .principal_specs(&account())
        .unwrap()
        .remove(0)
        .role
}

pub fn variables(value: Value) -> TemplateVariables {
    value.as_object().cloned().unwrap()
}

pub struct Harness {
    pub iam: Arc<FakeIam>,
    pub reconciler: PrincipalReconciler,
}

pub fn harness(auxiliary: &str) -> Harness {
    init_test_logging();
    let iam = Arc::new(FakeIam::new(ACCOUNT_ID));
    let clients = Arc::new(FakeClients {
        iam: iam.clone(),
        unavailable: false,
    });
    let reconciler = PrincipalReconciler::new(
        clients,
        Arc::new(templates()),
        Arc::new(config(auxiliary)),
    );
    Harness { iam, reconciler }
}
