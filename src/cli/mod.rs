//! cli
//!
//! Command-line interface layer for gitfacade.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install the tracing subscriber
//! - Resolve configuration and credential overrides into a client
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to a
//! [`crate::client::RepositoryClient`] for execution. Every repository
//! operation goes through the client, so every handle is released.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use tracing_subscriber::EnvFilter;

use crate::client::RepositoryClient;
use crate::core::config::Config;
use crate::core::credentials::CredentialSpec;
use crate::core::registry::HandleRegistry;
use crate::ui::output::{self, Verbosity};
use args::CredentialArgs;

/// Environment variable holding the password for `--http-user`.
pub const PASSWORD_ENV: &str = "GITFACADE_PASSWORD";

/// Execution context shared by command handlers.
#[derive(Debug, Clone)]
pub struct Context {
    /// Directory commands operate on
    pub cwd: PathBuf,
    /// Debug output enabled
    pub debug: bool,
    /// Minimal output
    pub quiet: bool,
    /// Prompts allowed
    pub interactive: bool,
    /// Credentials given on the command line, overriding config
    pub credentials: Option<CredentialSpec>,
}

impl Context {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }

    /// Load configuration for `dir` and build a client for it.
    ///
    /// Applies the configured leak threshold to the global registry and
    /// prints config warnings.
    pub fn client_for(&self, dir: &Path) -> Result<(RepositoryClient, Config)> {
        let loaded = Config::load(Some(dir)).context("Failed to load configuration")?;
        for warning in &loaded.warnings {
            output::warn(
                format!("{} ({})", warning.message, warning.path.display()),
                self.verbosity(),
            );
        }

        let config = loaded.config;
        HandleRegistry::global().set_leak_threshold(config.leak_threshold());

        let mut client = RepositoryClient::from_config(dir, &config);
        if let Some(credentials) = &self.credentials {
            client = client.with_credentials(credentials.clone());
        }
        Ok((client, config))
    }

    /// Client for the working directory.
    pub fn client(&self) -> Result<RepositoryClient> {
        self.client_for(&self.cwd).map(|(client, _)| client)
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    let cwd = match &cli.cwd {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };
    let interactive = cli.interactive();
    let credentials = resolve_credentials(&cli.credentials, interactive)?;

    let ctx = Context {
        cwd,
        debug: cli.debug,
        quiet: cli.quiet,
        interactive,
        credentials,
    };

    commands::dispatch(cli.command, &ctx)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `warn`, or `debug` with `--debug`.
fn init_tracing(debug: bool) {
    let default = if debug { "gitfacade=debug,warn" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A subscriber may already be installed when embedded; keep that one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(debug)
        .try_init();
}

/// Turn credential flags into a spec, prompting for a password if needed.
fn resolve_credentials(args: &CredentialArgs, interactive: bool) -> Result<Option<CredentialSpec>> {
    if args.anonymous {
        return Ok(Some(CredentialSpec::Anonymous));
    }

    if let Some(key) = &args.ssh_key {
        return Ok(Some(CredentialSpec::ssh_key(key.clone())));
    }

    if let Some(user) = &args.http_user {
        let password = match std::env::var(PASSWORD_ENV) {
            Ok(password) => password,
            Err(_) if interactive => {
                rpassword::prompt_password(format!("Password for {}: ", user))
                    .context("Failed to read password")?
            }
            Err(_) => bail!(
                "Password required for --http-user. Set ${} or run interactively.",
                PASSWORD_ENV
            ),
        };
        let spec = CredentialSpec::http(user.clone(), password);
        spec.validate().context("Invalid http credentials")?;
        return Ok(Some(spec));
    }

    Ok(None)
}
