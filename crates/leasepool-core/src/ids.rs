//! Identifier types
//!
//! Newtype wrappers for the externally assigned account and lease
//! identifiers. Both are opaque strings; construction rejects empty values
//! and embedded whitespace.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};

fn validate(kind: &'static str, value: &str) -> CoreResult<()> {
    if value.is_empty() {
        return Err(CoreError::InvalidIdentifier {
            kind,
            value: value.to_string(),
            message: "must not be empty".to_string(),
        });
    }
    if value.chars().any(char::is_whitespace) {
        return Err(CoreError::InvalidIdentifier {
            kind,
            value: value.to_string(),
            message: "must not contain whitespace".to_string(),
        });
    }
    Ok(())
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap an identifier.
            pub fn new(value: impl Into<String>) -> CoreResult<Self> {
                let value = value.into();
                validate($kind, &value)?;
                Ok(Self(value))
            }

            /// Borrow the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = CoreError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Identifier of a pooled cloud account.
    AccountId,
    "account id"
);

define_id!(
    /// Identifier of a lease.
    LeaseId,
    "lease id"
);
