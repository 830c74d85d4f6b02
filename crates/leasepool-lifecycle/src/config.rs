//! Reset processor configuration.

use std::env;

use leasepool_iam::config::ConfigError;

/// Settings for [`crate::ResetProcessor`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetConfig {
    /// Move the account to `Ready` once its principal has been reconciled.
    pub mark_ready: bool,
}

impl ResetConfig {
    /// Parse configuration from environment variables.
    ///
    /// Reads `RESET_MARK_READY` (`true`/`false`, default `false`).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Parse configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mark_ready = match lookup("RESET_MARK_READY").as_deref().map(str::trim) {
            None | Some("") => false,
            Some(raw) => parse_bool(raw).ok_or_else(|| ConfigError::Invalid {
                variable: "RESET_MARK_READY",
                message: format!("'{raw}' is not a boolean"),
            })?,
        };
        Ok(Self { mark_ready })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
