//! In-memory collaborators for lifecycle tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use leasepool_core::{
    Account, AccountId, AccountStatus, Arn, Lease, LeaseId, LeaseStatus, LeaseStatusReason,
};
use leasepool_iam::prelude::*;
use leasepool_lifecycle::{
    AccountStore, LeaseStore, QueueError, ResetMessage, ResetQueue, StoreError,
};

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

/// Account store backed by a map, counting every call.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<HashMap<String, Account>>,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
    pub fail_puts: AtomicBool,
}

impl MemoryAccountStore {
    pub fn with(accounts: Vec<Account>) -> Self {
        let store = Self::default();
        for account in accounts {
            store
                .accounts
                .lock()
                .unwrap()
                .insert(account.id.to_string(), account);
        }
        store
    }

    pub fn account(&self, id: &str) -> Option<Account> {
        self.accounts.lock().unwrap().get(id).cloned()
    }

    pub fn calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst) + self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.accounts.lock().unwrap().get(id.as_str()).cloned())
    }

    async fn put_account(&self, account: &Account) -> Result<(), StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::new("conditional check failed"));
        }
        self.accounts
            .lock()
            .unwrap()
            .insert(account.id.to_string(), account.clone());
        Ok(())
    }
}

/// Lease store backed by a map, counting every call.
#[derive(Default)]
pub struct MemoryLeaseStore {
    leases: Mutex<HashMap<String, Lease>>,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
}

impl MemoryLeaseStore {
    pub fn with(leases: Vec<Lease>) -> Self {
        let store = Self::default();
        for lease in leases {
            store
                .leases
                .lock()
                .unwrap()
                .insert(lease.id.to_string(), lease);
        }
        store
    }

    pub fn lease(&self, id: &str) -> Option<Lease> {
        self.leases.lock().unwrap().get(id).cloned()
    }

    pub fn calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst) + self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LeaseStore for MemoryLeaseStore {
    async fn get_lease(&self, id: &LeaseId) -> Result<Option<Lease>, StoreError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.leases.lock().unwrap().get(id.as_str()).cloned())
    }

    async fn put_lease(&self, lease: &Lease) -> Result<(), StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.leases
            .lock()
            .unwrap()
            .insert(lease.id.to_string(), lease.clone());
        Ok(())
    }
}

/// Queue recording every sent message.
#[derive(Default)]
pub struct MemoryQueue {
    messages: Mutex<Vec<ResetMessage>>,
    pub fail: AtomicBool,
}

impl MemoryQueue {
    pub fn messages(&self) -> Vec<ResetMessage> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResetQueue for MemoryQueue {
    async fn send_reset(&self, message: ResetMessage) -> Result<(), QueueError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(QueueError::new("queue unavailable"));
        }
        self.messages.lock().unwrap().push(message);
        Ok(())
    }
}

/// Identity provider that accepts every write and has no prior state.
#[derive(Default)]
pub struct AcceptingIam {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
    pub fail_attach: AtomicBool,
}

impl AcceptingIam {
    fn call(&self) -> IamResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(IamError::other("Throttling: rate exceeded"));
        }
        Ok(())
    }
}

#[async_trait]
impl IamApi for AcceptingIam {
    async fn create_role(&self, _request: CreateRoleRequest) -> IamResult<()> {
        self.call()
    }

    async fn delete_role(&self, _role_name: &str) -> IamResult<()> {
        self.call()
    }

    async fn create_policy(&self, _request: CreatePolicyRequest) -> IamResult<()> {
        self.call()
    }

    async fn delete_policy(&self, _policy_arn: &Arn) -> IamResult<()> {
        self.call()
    }

    async fn create_policy_version(
        &self,
        _policy_arn: &Arn,
        _document: &str,
        _set_as_default: bool,
    ) -> IamResult<()> {
        self.call()
    }

    async fn delete_policy_version(&self, _policy_arn: &Arn, _version_id: &str) -> IamResult<()> {
        self.call()
    }

    async fn list_policy_versions(&self, _policy_arn: &Arn) -> IamResult<Vec<PolicyVersion>> {
        self.call().map(|()| Vec::new())
    }

    async fn attach_role_policy(&self, _role_name: &str, _policy_arn: &Arn) -> IamResult<()> {
        self.call()?;
        if self.fail_attach.load(Ordering::SeqCst) {
            return Err(IamError::other("ServiceFailure: attach failed"));
        }
        Ok(())
    }

    async fn detach_role_policy(&self, _role_name: &str, _policy_arn: &Arn) -> IamResult<()> {
        self.call()
    }
}

pub fn account(id: &str, status: AccountStatus) -> Account {
    let id = AccountId::new(id).unwrap();
    let mut account = Account::new(
        id.clone(),
        Arn::iam_role(&id, "AdminRole").unwrap(),
        Arn::iam_role(&id, "LeasepoolPrincipal").unwrap(),
        Arn::iam_policy(&id, "LeasepoolPrincipalDefaultPolicy").unwrap(),
        an_hour_ago(),
    );
    account.status = status;
    account
}

pub fn lease(id: &str) -> Lease {
    let created = an_hour_ago();
    Lease {
        id: LeaseId::new(id).unwrap(),
        account_id: AccountId::new("123456789012").unwrap(),
        principal_id: "jdoe".to_string(),
        status: LeaseStatus::Active,
        status_reason: LeaseStatusReason::Active,
        budget_amount: 100.0,
        budget_currency: "USD".to_string(),
        budget_notification_emails: vec!["owner@example.com".to_string()],
        expires_on: None,
        created_on: created,
        last_modified_on: created,
        status_modified_on: created,
    }
}

pub fn an_hour_ago() -> DateTime<Utc> {
    Utc::now() - Duration::hours(1)
}

pub fn reconciler(iam: Arc<AcceptingIam>) -> Arc<PrincipalReconciler> {
    let config = PrincipalConfig::from_lookup(|name| match name {
        "ARTIFACTS_BUCKET" => Some("artifacts".to_string()),
        "PRINCIPAL_TRUSTED_ACCOUNT_ID" => Some("000000000000".to_string()),
        "ALLOWED_REGIONS" => Some("us-east-1".to_string()),
        _ => None,
    })
    .unwrap();
    let templates = HandlebarsTemplateStore::new(
        MemoryTemplateSource::new()
            .with_template(
                TemplateLocation::new("artifacts", &config.policy_key),
                r#"{"Resource":"{{PrincipalRoleArn}}","Account":"{{AccountId}}"}"#,
            )
            .with_template(
                TemplateLocation::new("artifacts", &config.trust_policy_key),
                r#"{"AWS":"arn:aws:iam::{{TrustedAccountId}}:root"}"#,
            ),
    );
    Arc::new(PrincipalReconciler::new(
        Arc::new(StaticIamClientProvider::new(iam)),
        Arc::new(templates),
        Arc::new(config),
    ))
}
