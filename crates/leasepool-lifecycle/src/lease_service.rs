//! Lease updates.
//!
//! An update is validated in full before the store is read. The body may
//! repeat the lease id but never change it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use leasepool_core::{Lease, LeaseId};
use serde::Deserialize;
use tracing::{info, instrument};
use validator::{Validate, ValidateEmail, ValidationErrors};

use crate::error::{LifecycleError, LifecycleResult};
use crate::store::LeaseStore;

/// Fields a caller may change on a lease. Absent fields are left as they
/// are.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LeaseUpdate {
    /// Must equal the addressed lease id when present.
    pub id: Option<String>,

    #[validate(range(min = 0.0, message = "Budget amount cannot be negative"))]
    pub budget_amount: Option<f64>,

    #[validate(length(equal = 3, message = "Budget currency must be a 3-letter code"))]
    pub budget_currency: Option<String>,

    pub budget_notification_emails: Option<Vec<String>>,

    pub expires_on: Option<DateTime<Utc>>,
}

impl LeaseUpdate {
    /// Check the update against the lease it addresses.
    pub fn check(&self, lease_id: &LeaseId) -> LifecycleResult<()> {
        if let Some(body_id) = &self.id {
            if body_id.is_empty() || body_id != lease_id.as_str() {
                return Err(LifecycleError::validation(
                    "lease",
                    "id",
                    format!("cannot change lease id '{lease_id}' to '{body_id}'"),
                ));
            }
        }
        self.validate().map_err(validation_error)?;

        let emails = self.budget_notification_emails.as_deref().unwrap_or_default();
        if let Some(bad) = emails.iter().find(|email| !email.validate_email()) {
            return Err(LifecycleError::validation(
                "lease",
                "budget_notification_emails",
                format!("'{bad}' is not a valid email address"),
            ));
        }
        Ok(())
    }

    fn apply(&self, lease: &mut Lease, now: DateTime<Utc>) {
        if let Some(amount) = self.budget_amount {
            lease.budget_amount = amount;
        }
        if let Some(currency) = &self.budget_currency {
            lease.budget_currency = currency.clone();
        }
        if let Some(emails) = &self.budget_notification_emails {
            lease.budget_notification_emails = emails.clone();
        }
        if let Some(expires_on) = self.expires_on {
            lease.expires_on = Some(expires_on);
        }
        lease.last_modified_on = now;
    }
}

/// Report the first failing field, in field-name order.
fn validation_error(errors: ValidationErrors) -> LifecycleError {
    let mut fields: Vec<(String, String)> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let message = errs
                .first()
                .and_then(|e| e.message.as_ref().map(ToString::to_string))
                .unwrap_or_else(|| "invalid value".to_string());
            (field.to_string(), message)
        })
        .collect();
    fields.sort();

    match fields.into_iter().next() {
        Some((field, message)) => LifecycleError::validation("lease", field, message),
        None => LifecycleError::validation("lease", "body", "invalid lease update"),
    }
}

/// Applies caller updates to leases.
#[derive(Clone)]
pub struct LeaseService {
    leases: Arc<dyn LeaseStore>,
}

impl LeaseService {
    /// Create a new lease service.
    #[must_use]
    pub fn new(leases: Arc<dyn LeaseStore>) -> Self {
        Self { leases }
    }

    /// Validate and apply `update` to the lease `id`, returning the saved
    /// record.
    #[instrument(skip(self, update), fields(lease_id = %id))]
    pub async fn update(&self, id: &LeaseId, update: LeaseUpdate) -> LifecycleResult<Lease> {
        update.check(id)?;

        let mut lease = self
            .leases
            .get_lease(id)
            .await?
            .ok_or_else(|| LifecycleError::not_found("lease", id))?;

        update.apply(&mut lease, Utc::now());
        self.leases.put_lease(&lease).await?;

        info!(
            lease_id = %id,
            account_id = %lease.account_id,
            budget_amount = lease.budget_amount,
            "Lease updated"
        );
        Ok(lease)
    }
}
