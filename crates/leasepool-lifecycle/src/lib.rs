//! # Leasepool Lifecycle
//!
//! Account and lease lifecycle flows for the sandbox account pool.
//!
//! - [`AccountService`] moves accounts through their status machine and
//!   queues resets.
//! - [`LeaseService`] validates and applies lease updates.
//! - [`ResetProcessor`] consumes one queued reset and reconciles the
//!   account's principal identity.
//!
//! Persistence and queue transport are collaborators behind the traits in
//! [`store`] and [`queue`]; every service takes them as constructor
//! arguments.

pub mod account_service;
pub mod config;
pub mod error;
pub mod lease_service;
pub mod queue;
pub mod reset;
pub mod store;

pub use account_service::AccountService;
pub use config::ResetConfig;
pub use error::{LifecycleError, LifecycleResult, QueueError, StoreError};
pub use lease_service::{LeaseService, LeaseUpdate};
pub use queue::{ResetMessage, ResetQueue};
pub use reset::ResetProcessor;
pub use store::{AccountStore, LeaseStore};
