//! git::transport
//!
//! Maps a [`CredentialSpec`] onto libgit2 remote callbacks.
//!
//! The credentials callback dispatches on the spec's kind:
//!
//! - `Ssh` → `Cred::ssh_key` with the configured or default key pair
//! - `Http` → `Cred::userpass_plaintext`
//! - `Anonymous` → `Cred::username`
//!
//! libgit2 re-invokes the callback after every rejected attempt, so the
//! callback gives up after [`MAX_CREDENTIAL_ATTEMPTS`].

use git2::{CertificateCheckStatus, Cred, CredentialType, FetchOptions, PushOptions, RemoteCallbacks};

use crate::core::credentials::{default_private_key, default_public_key, CredentialSpec};

/// How many times the credentials callback answers before failing.
pub const MAX_CREDENTIAL_ATTEMPTS: u32 = 3;

/// Username offered when neither the URL nor the spec names one.
const FALLBACK_USERNAME: &str = "git";

/// Transport settings shared by clone, fetch and push.
#[derive(Debug, Clone, Default)]
pub struct Transport {
    /// Credentials forwarded to the credentials callback.
    pub credentials: CredentialSpec,
    /// Accept any host certificate.
    pub skip_certificate_check: bool,
}

impl Transport {
    /// Transport for the given credentials with certificate checks on.
    pub fn new(credentials: CredentialSpec) -> Self {
        Self {
            credentials,
            skip_certificate_check: false,
        }
    }

    /// Build remote callbacks carrying the credential and certificate policy.
    pub(crate) fn remote_callbacks<'cb>(&self) -> RemoteCallbacks<'cb> {
        let mut callbacks = RemoteCallbacks::new();

        let credentials = self.credentials.clone();
        let mut attempts = 0u32;
        callbacks.credentials(move |url, username_from_url, allowed| {
            attempts += 1;
            if attempts > MAX_CREDENTIAL_ATTEMPTS {
                tracing::warn!(
                    url,
                    kind = credentials.kind(),
                    attempts = MAX_CREDENTIAL_ATTEMPTS,
                    "remote rejected credentials"
                );
                return Err(git2::Error::from_str(&format!(
                    "authentication failed for {} after {} attempts",
                    url, MAX_CREDENTIAL_ATTEMPTS
                )));
            }
            tracing::debug!(url, kind = credentials.kind(), attempt = attempts, "supplying credentials");
            credential_for(&credentials, username_from_url, allowed)
        });

        if self.skip_certificate_check {
            callbacks.certificate_check(|_cert, host| {
                tracing::debug!(host, "skipping certificate check");
                Ok(CertificateCheckStatus::CertificateOk)
            });
        }

        callbacks
    }

    /// Fetch options for fetch and clone.
    pub(crate) fn fetch_options<'cb>(&self) -> FetchOptions<'cb> {
        let mut options = FetchOptions::new();
        options.remote_callbacks(self.remote_callbacks());
        options
    }

    /// Push options wrapping the given callbacks.
    pub(crate) fn push_options(callbacks: RemoteCallbacks<'_>) -> PushOptions<'_> {
        let mut options = PushOptions::new();
        options.remote_callbacks(callbacks);
        options
    }
}

/// Produce a libgit2 credential for one callback invocation.
fn credential_for(
    spec: &CredentialSpec,
    username_from_url: Option<&str>,
    allowed: CredentialType,
) -> Result<Cred, git2::Error> {
    let spec_username = match spec {
        CredentialSpec::Ssh { username, .. } => username.as_deref(),
        CredentialSpec::Http { username, .. } => Some(username.as_str()),
        CredentialSpec::Anonymous => None,
    };
    let username = username_from_url
        .or(spec_username)
        .unwrap_or(FALLBACK_USERNAME);

    // ssh transports first ask for the login name alone when the URL has none.
    if allowed == CredentialType::USERNAME {
        return Cred::username(username);
    }

    match spec {
        CredentialSpec::Ssh {
            private_key,
            public_key,
            passphrase,
            ..
        } => {
            let private_key = private_key
                .clone()
                .or_else(default_private_key)
                .ok_or_else(|| git2::Error::from_str("no ssh private key and no home directory"))?;
            let public_key = public_key
                .clone()
                .or_else(|| default_public_key().filter(|p| p.exists()));
            Cred::ssh_key(
                username,
                public_key.as_deref(),
                &private_key,
                passphrase.as_deref().filter(|p| !p.is_empty()),
            )
        }
        CredentialSpec::Http { username, password } => Cred::userpass_plaintext(username, password),
        CredentialSpec::Anonymous => Cred::username(username),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_yields_userpass() {
        let cred = credential_for(
            &CredentialSpec::http("bot", "pw"),
            None,
            CredentialType::USER_PASS_PLAINTEXT,
        );
        assert!(cred.is_ok());
    }

    #[test]
    fn anonymous_yields_username() {
        let cred = credential_for(
            &CredentialSpec::Anonymous,
            Some("alice"),
            CredentialType::USER_PASS_PLAINTEXT,
        )
        .unwrap();
        assert!(cred.has_username());
    }

    #[test]
    fn username_probe_answered_for_ssh() {
        let cred = credential_for(&CredentialSpec::default(), None, CredentialType::USERNAME)
            .unwrap();
        assert!(cred.has_username());
    }

    #[test]
    fn callbacks_build_for_every_kind() {
        for spec in [
            CredentialSpec::default(),
            CredentialSpec::http("u", "p"),
            CredentialSpec::Anonymous,
        ] {
            let transport = Transport {
                credentials: spec,
                skip_certificate_check: true,
            };
            let _ = transport.fetch_options();
            let _ = Transport::push_options(transport.remote_callbacks());
        }
    }
}
