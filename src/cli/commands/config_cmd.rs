//! config command - Get, set, or list configuration values
//!
//! # Keys
//!
//! | Key | Scope | Value |
//! |-----|-------|-------|
//! | `leak_threshold` | global | positive integer |
//! | `remote` | both | remote name |
//! | `credentials` | both | `ssh`, `ssh:<private key path>` or `anonymous` |
//! | `identity` | both | `Name <email>` |
//! | `transport.skip_certificate_check` | both | `true` / `false` |
//!
//! Http credentials hold a password and are only read from config files or
//! `--http-user`, never set from the command line.

use anyhow::{anyhow, bail, Context as _, Result};

use super::block_on;
use crate::cli::Context;
use crate::core::config::{Config, TransportConfig};
use crate::core::credentials::CredentialSpec;
use crate::core::types::Identity;
use crate::ui::output;

const KEYS: [&str; 5] = [
    "leak_threshold",
    "remote",
    "credentials",
    "identity",
    "transport.skip_certificate_check",
];

/// Get a configuration value.
pub fn get(ctx: &Context, key: &str) -> Result<()> {
    let config = load(ctx)?;
    // Key exists but has no value - exit silently
    if let Some(value) = value_of(&config, key)? {
        println!("{}", value);
    }
    Ok(())
}

/// Set a configuration value in the repository or global file.
pub fn set(ctx: &Context, key: &str, value: &str, global: bool) -> Result<()> {
    let config = load(ctx)?;

    let path = if global {
        let mut updated = config.global.clone();
        match key {
            "leak_threshold" => {
                let threshold: usize = value
                    .parse()
                    .with_context(|| format!("Invalid leak_threshold '{}'", value))?;
                updated.leak_threshold = Some(threshold);
            }
            _ => apply(
                key,
                value,
                &mut updated.remote,
                &mut updated.credentials,
                &mut updated.identity,
                &mut updated.transport,
            )?,
        }
        config
            .write_global(&updated)
            .context("Failed to write global config")?
    } else {
        if key == "leak_threshold" {
            bail!("leak_threshold is process-wide; use --global");
        }
        if !ctx.cwd.join(".git").is_dir() {
            bail!("Not a git repository: {}. Use --global or run 'gf init'.", ctx.cwd.display());
        }
        let mut updated = config.repo.clone().unwrap_or_default();
        apply(
            key,
            value,
            &mut updated.remote,
            &mut updated.credentials,
            &mut updated.identity,
            &mut updated.transport,
        )?;
        Config::write_repo(&ctx.cwd, &updated).context("Failed to write repository config")?
    };

    output::print(
        format!("Set {} = {} ({})", key, value, path.display()),
        ctx.verbosity(),
    );
    Ok(())
}

/// List all configuration values, or the merged git configuration.
pub fn list(ctx: &Context, git: bool) -> Result<()> {
    if git {
        let client = ctx.client()?;
        let entries = block_on(client.git_config())?.context("Failed to read git config")?;
        for (key, value) in entries {
            println!("{}={}", key, value);
        }
        return Ok(());
    }

    let config = load(ctx)?;

    if !ctx.quiet {
        let describe = |path: Option<&std::path::Path>| {
            path.map(|p| p.display().to_string())
                .unwrap_or_else(|| "(none)".to_string())
        };
        println!("# global: {}", describe(config.global_config_loaded_from()));
        println!("# repo:   {}", describe(config.repo_config_loaded_from()));
    }

    for key in KEYS {
        let value = value_of(&config, key)?.unwrap_or_else(|| "(not set)".to_string());
        println!("{} = {}", key, value);
    }
    Ok(())
}

fn load(ctx: &Context) -> Result<Config> {
    Ok(Config::load(Some(ctx.cwd.as_path()))
        .context("Failed to load configuration")?
        .config)
}

/// Effective value of `key` after precedence.
fn value_of(config: &Config, key: &str) -> Result<Option<String>> {
    let value = match key {
        "leak_threshold" => Some(config.leak_threshold().to_string()),
        "remote" => Some(config.remote().to_string()),
        "credentials" => Some(describe_credentials(&config.credentials())),
        "identity" => config
            .identity()
            .map(|i| format!("{} <{}>", i.name, i.email)),
        "transport.skip_certificate_check" => Some(config.skip_certificate_check().to_string()),
        _ => bail!("Unknown configuration key: {}", key),
    };
    Ok(value)
}

fn describe_credentials(spec: &CredentialSpec) -> String {
    match spec {
        CredentialSpec::Ssh {
            private_key: Some(key),
            ..
        } => format!("ssh:{}", key.display()),
        CredentialSpec::Http { username, .. } => format!("http:{}", username),
        other => other.kind().to_string(),
    }
}

/// Update one scope-independent key.
fn apply(
    key: &str,
    value: &str,
    remote: &mut Option<String>,
    credentials: &mut Option<CredentialSpec>,
    identity: &mut Option<Identity>,
    transport: &mut Option<TransportConfig>,
) -> Result<()> {
    match key {
        "remote" => *remote = Some(value.to_string()),
        "credentials" => *credentials = Some(parse_credentials(value)?),
        "identity" => *identity = Some(parse_identity(value)?),
        "transport.skip_certificate_check" => {
            let skip: bool = value
                .parse()
                .with_context(|| format!("Expected true or false, got '{}'", value))?;
            transport.get_or_insert_with(TransportConfig::default).skip_certificate_check =
                Some(skip);
        }
        "leak_threshold" => bail!("leak_threshold is process-wide; use --global"),
        _ => bail!("Unknown configuration key: {}", key),
    }
    Ok(())
}

fn parse_credentials(value: &str) -> Result<CredentialSpec> {
    match value.split_once(':') {
        None if value == "ssh" => Ok(CredentialSpec::default()),
        None if value == "anonymous" => Ok(CredentialSpec::Anonymous),
        Some(("ssh", path)) if !path.is_empty() => Ok(CredentialSpec::ssh_key(path)),
        _ if value.starts_with("http") => bail!(
            "http credentials carry a password; edit the config file or use --http-user"
        ),
        _ => bail!(
            "Invalid credentials '{}': expected ssh, ssh:<key path> or anonymous",
            value
        ),
    }
}

fn parse_identity(value: &str) -> Result<Identity> {
    let (name, rest) = value
        .split_once('<')
        .ok_or_else(|| anyhow!("Expected identity as 'Name <email>', got '{}'", value))?;
    let email = rest
        .strip_suffix('>')
        .ok_or_else(|| anyhow!("Expected identity as 'Name <email>', got '{}'", value))?;

    Ok(Identity {
        name: name.trim().to_string(),
        email: email.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_identity_forms() {
        let identity = parse_identity("Build Bot <bot@example.com>").unwrap();
        assert_eq!(identity.name, "Build Bot");
        assert_eq!(identity.email, "bot@example.com");

        assert!(parse_identity("Build Bot").is_err());
        assert!(parse_identity("Build Bot <bot@example.com").is_err());
    }

    #[test]
    fn parse_credentials_forms() {
        assert_eq!(parse_credentials("ssh").unwrap(), CredentialSpec::default());
        assert_eq!(
            parse_credentials("ssh:/keys/deploy").unwrap(),
            CredentialSpec::ssh_key("/keys/deploy")
        );
        assert_eq!(
            parse_credentials("anonymous").unwrap(),
            CredentialSpec::Anonymous
        );
        assert!(parse_credentials("http:bot").is_err());
        assert!(parse_credentials("kerberos").is_err());
    }

    #[test]
    fn describe_round_trips_ssh_key() {
        let spec = parse_credentials("ssh:/keys/deploy").unwrap();
        assert_eq!(describe_credentials(&spec), "ssh:/keys/deploy");
    }

    #[test]
    fn unknown_key_rejected() {
        let config = Config::default();
        assert!(value_of(&config, "trunk").is_err());
        assert_eq!(
            value_of(&config, "remote").unwrap().as_deref(),
            Some("origin")
        );
        assert!(value_of(&config, "identity").unwrap().is_none());
    }

    #[test]
    fn apply_sets_transport() {
        let (mut remote, mut credentials, mut identity, mut transport) = (None, None, None, None);
        apply(
            "transport.skip_certificate_check",
            "true",
            &mut remote,
            &mut credentials,
            &mut identity,
            &mut transport,
        )
        .unwrap();
        assert_eq!(transport.and_then(|t| t.skip_certificate_check), Some(true));
    }
}
