//! # Leasepool Core
//!
//! Shared building blocks for the leasepool sandbox account pool.
//!
//! - [`ids`] - Validated identifiers (`AccountId`, `LeaseId`)
//! - [`arn`] - Canonical resource names for identity-provider objects
//! - [`account`] - Pooled account records and their status machine
//! - [`lease`] - Lease records granting an account to a consumer
//! - [`error`] - Error types shared by every leasepool crate

pub mod account;
pub mod arn;
pub mod error;
pub mod ids;
pub mod lease;

pub use account::{Account, AccountStatus};
pub use arn::Arn;
pub use error::{CoreError, CoreResult};
pub use ids::{AccountId, LeaseId};
pub use lease::{Lease, LeaseStatus, LeaseStatusReason};
