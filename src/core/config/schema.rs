//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$GITFACADE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/gitfacade/config.toml`
//! 3. `~/.gitfacade/config.toml` (canonical write location)
//!
//! # Repo Config
//!
//! Located at `.git/gitfacade/config.toml`.
//!
//! # Validation
//!
//! Config values are validated after parsing to ensure they conform to
//! expected formats (e.g., http credentials must name a user).

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::credentials::CredentialSpec;
use crate::core::types::Identity;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// leak_threshold = 10
/// remote = "origin"
///
/// [credentials]
/// kind = "ssh"
/// private_key = "/home/me/.ssh/id_ed25519"
///
/// [identity]
/// name = "Build Bot"
/// email = "bot@example.com"
///
/// [transport]
/// skip_certificate_check = false
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Open handle count above which a leak warning is logged
    pub leak_threshold: Option<usize>,

    /// Default remote name
    pub remote: Option<String>,

    /// Default credentials for remote transport
    pub credentials: Option<CredentialSpec>,

    /// Commit identity used when git config has none
    pub identity: Option<Identity>,

    /// Transport settings
    pub transport: Option<TransportConfig>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.leak_threshold == Some(0) {
            return Err(ConfigError::InvalidValue(
                "leak_threshold must be at least 1".to_string(),
            ));
        }
        validate_shared(
            self.remote.as_deref(),
            self.credentials.as_ref(),
            self.identity.as_ref(),
        )
    }
}

/// Repository configuration.
///
/// Same keys as [`GlobalConfig`] except `leak_threshold`, which is
/// process-wide.
///
/// # Example
///
/// ```toml
/// remote = "upstream"
///
/// [credentials]
/// kind = "http"
/// username = "ci-bot"
/// password = "token"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Remote name (default: "origin")
    pub remote: Option<String>,

    /// Credentials for this repository's remotes
    pub credentials: Option<CredentialSpec>,

    /// Commit identity used when git config has none
    pub identity: Option<Identity>,

    /// Transport settings
    pub transport: Option<TransportConfig>,
}

impl RepoConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_shared(
            self.remote.as_deref(),
            self.credentials.as_ref(),
            self.identity.as_ref(),
        )
    }
}

/// Transport settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TransportConfig {
    /// Accept any host certificate
    pub skip_certificate_check: Option<bool>,
}

fn validate_shared(
    remote: Option<&str>,
    credentials: Option<&CredentialSpec>,
    identity: Option<&Identity>,
) -> Result<(), ConfigError> {
    if let Some(remote) = remote {
        if remote.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "remote cannot be empty".to_string(),
            ));
        }
    }

    if let Some(credentials) = credentials {
        credentials
            .validate()
            .map_err(|e| ConfigError::InvalidValue(format!("invalid credentials: {}", e)))?;
    }

    if let Some(identity) = identity {
        if identity.name.trim().is_empty() || identity.email.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "identity requires both name and email".to_string(),
            ));
        }
    }

    Ok(())
}
