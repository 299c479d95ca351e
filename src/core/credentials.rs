//! core::credentials
//!
//! Declarative description of how to authenticate remote transport.
//!
//! # Design
//!
//! A [`CredentialSpec`] is an opaque value object: it is forwarded to the
//! git layer, which turns it into libgit2 credential callbacks. Nothing here
//! stores or resolves secrets beyond filling in the default ssh key paths.
//!
//! # Security
//!
//! `Debug` output redacts passwords and passphrases, so a spec can be
//! logged or embedded in error context safely.
//!
//! # Example
//!
//! ```
//! use gitfacade::core::credentials::CredentialSpec;
//!
//! let spec: CredentialSpec = toml::from_str(r#"
//!     kind = "http"
//!     username = "ci-bot"
//!     password = "hunter2"
//! "#).unwrap();
//!
//! assert_eq!(spec.kind(), "http");
//! assert!(!format!("{:?}", spec).contains("hunter2"));
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from credential validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("http credentials require a non-empty username")]
    MissingUsername,
}

/// How to authenticate against a remote.
///
/// Defaults to ssh with the key pair in `~/.ssh`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CredentialSpec {
    /// Public-key authentication.
    Ssh {
        /// Login name; the name embedded in the remote URL wins when present.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        /// Private key path (default `~/.ssh/id_rsa`).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        private_key: Option<PathBuf>,
        /// Public key path (default `~/.ssh/id_rsa.pub` when it exists).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        public_key: Option<PathBuf>,
        /// Key passphrase, if the key is encrypted.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        passphrase: Option<String>,
    },

    /// Username and password over HTTP(S).
    Http { username: String, password: String },

    /// Username only, no secret.
    Anonymous,
}

impl Default for CredentialSpec {
    fn default() -> Self {
        CredentialSpec::Ssh {
            username: None,
            private_key: None,
            public_key: None,
            passphrase: None,
        }
    }
}

impl CredentialSpec {
    /// Ssh credentials for an explicit private key.
    pub fn ssh_key(private_key: impl Into<PathBuf>) -> Self {
        CredentialSpec::Ssh {
            username: None,
            private_key: Some(private_key.into()),
            public_key: None,
            passphrase: None,
        }
    }

    /// Username/password credentials.
    pub fn http(username: impl Into<String>, password: impl Into<String>) -> Self {
        CredentialSpec::Http {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The tag used in config files: `ssh`, `http` or `anonymous`.
    pub fn kind(&self) -> &'static str {
        match self {
            CredentialSpec::Ssh { .. } => "ssh",
            CredentialSpec::Http { .. } => "http",
            CredentialSpec::Anonymous => "anonymous",
        }
    }

    /// Check the spec is usable.
    ///
    /// # Errors
    ///
    /// - [`CredentialError::MissingUsername`] for http specs with a blank user
    pub fn validate(&self) -> Result<(), CredentialError> {
        match self {
            CredentialSpec::Http { username, .. } if username.trim().is_empty() => {
                Err(CredentialError::MissingUsername)
            }
            _ => Ok(()),
        }
    }
}

/// Default private key location, `~/.ssh/id_rsa`.
pub fn default_private_key() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ssh").join("id_rsa"))
}

/// Default public key location, `~/.ssh/id_rsa.pub`.
pub fn default_public_key() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".ssh").join("id_rsa.pub"))
}

impl std::fmt::Debug for CredentialSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const REDACTED: &str = "<redacted>";
        match self {
            CredentialSpec::Ssh {
                username,
                private_key,
                public_key,
                passphrase,
            } => f
                .debug_struct("Ssh")
                .field("username", username)
                .field("private_key", private_key)
                .field("public_key", public_key)
                .field("passphrase", &passphrase.as_ref().map(|_| REDACTED))
                .finish(),
            CredentialSpec::Http { username, .. } => f
                .debug_struct("Http")
                .field("username", username)
                .field("password", &REDACTED)
                .finish(),
            CredentialSpec::Anonymous => f.write_str("Anonymous"),
        }
    }
}
