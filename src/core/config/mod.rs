//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! gitfacade has two configuration scopes:
//! - **Global**: User-level settings
//! - **Repo**: Repository-level overrides
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$GITFACADE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/gitfacade/config.toml`
//! 3. `~/.gitfacade/config.toml` (canonical write location)
//!
//! # Repo Config Location
//!
//! `.git/gitfacade/config.toml` under the working directory.
//!
//! # Example
//!
//! ```no_run
//! use gitfacade::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(Some(Path::new("/path/to/repo"))).unwrap();
//! let config = result.config;
//!
//! println!("Remote: {}", config.remote());
//! println!("Credentials: {}", config.credentials().kind());
//! println!("Leak threshold: {}", config.leak_threshold());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, RepoConfig, TransportConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::credentials::CredentialSpec;
use crate::core::registry::DEFAULT_LEAK_THRESHOLD;
use crate::core::types::Identity;
use crate::git::Transport;

/// Environment variable naming an explicit global config file.
pub const CONFIG_ENV: &str = "GITFACADE_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Merged configuration from all sources.
///
/// This struct provides accessor methods that apply precedence rules
/// automatically. Repo config overrides global config.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Repository configuration (if in a repo)
    pub repo: Option<RepoConfig>,
    /// Path to the global config file (if loaded)
    global_path: Option<PathBuf>,
    /// Path to the repo config file (if loaded)
    repo_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `repo_path` is provided, also loads repo-specific config.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed.
    /// Missing config files are not an error (defaults are used).
    pub fn load(repo_path: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        Self::load_from(Self::find_global().as_deref(), repo_path)
    }

    /// Load configuration with an explicit global config file.
    ///
    /// A `global_path` that does not exist is treated as absent.
    pub fn load_from(
        global_path: Option<&Path>,
        repo_path: Option<&Path>,
    ) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let (global, global_path) = match global_path.filter(|p| p.exists()) {
            Some(path) => (Self::read_config(path)?, Some(path.to_path_buf())),
            None => (GlobalConfig::default(), None),
        };

        let (repo, repo_path_found) = match repo_path {
            Some(path) => Self::load_repo(path, &mut warnings)?,
            None => (None, None),
        };

        global.validate()?;
        if let Some(ref r) = repo {
            r.validate()?;
        }

        if let (Some(path), Some(g)) = (&global_path, &global.transport) {
            if g.skip_certificate_check == Some(true) {
                warnings.push(ConfigWarning {
                    message: "certificate checks are disabled for all repositories".to_string(),
                    path: path.clone(),
                });
            }
        }

        Ok(ConfigLoadResult {
            config: Config {
                global,
                repo,
                global_path,
                repo_path: repo_path_found,
            },
            warnings,
        })
    }

    /// First existing global config file in search order.
    fn find_global() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("gitfacade/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".gitfacade/config.toml"))
            .filter(|path| path.exists())
    }

    /// Load repository configuration.
    fn load_repo(
        repo_path: &Path,
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<(Option<RepoConfig>, Option<PathBuf>), ConfigError> {
        let git_dir = repo_path.join(".git");
        if !git_dir.is_dir() {
            return Ok((None, None));
        }

        let path = Self::repo_config_path(repo_path);
        if !path.exists() {
            return Ok((None, None));
        }

        let config: RepoConfig = Self::read_config(&path)?;
        if matches!(config.credentials, Some(CredentialSpec::Http { .. })) {
            warnings.push(ConfigWarning {
                message: "repository config stores an http password in plain text".to_string(),
                path: path.clone(),
            });
        }
        Ok((Some(config), Some(path)))
    }

    /// Read and parse a config file.
    fn read_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the canonical path for global config.
    ///
    /// Returns `~/.gitfacade/config.toml`.
    pub fn global_config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".gitfacade/config.toml"))
    }

    /// Get the canonical path for repo config.
    ///
    /// Returns `.git/gitfacade/config.toml` relative to the given repo path.
    pub fn repo_config_path(repo_path: &Path) -> PathBuf {
        repo_path.join(".git/gitfacade/config.toml")
    }

    /// Write global config atomically.
    ///
    /// Writes to the file it was loaded from when there is one, else to
    /// the canonical location.
    pub fn write_global(&self, config: &GlobalConfig) -> Result<PathBuf, ConfigError> {
        let path = match &self.global_path {
            Some(path) => path.clone(),
            None => Self::global_config_path()?,
        };
        config.validate()?;
        Self::write_config_atomic(&path, config)?;
        Ok(path)
    }

    /// Write repo config atomically.
    ///
    /// Creates parent directories if needed. Uses atomic write
    /// (write to temp file, then rename) to prevent corruption.
    pub fn write_repo(repo_path: &Path, config: &RepoConfig) -> Result<PathBuf, ConfigError> {
        let path = Self::repo_config_path(repo_path);
        config.validate()?;
        Self::write_config_atomic(&path, config)?;
        Ok(path)
    }

    /// Write a config file atomically.
    fn write_config_atomic<T: serde::Serialize>(
        path: &Path,
        config: &T,
    ) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        // Temp file in the same directory so the rename stays on one filesystem
        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        file.write_all(contents.as_bytes())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;

        file.sync_all().map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Open handle count above which a leak warning is logged.
    ///
    /// Defaults to 10 if not configured.
    pub fn leak_threshold(&self) -> usize {
        self.global.leak_threshold.unwrap_or(DEFAULT_LEAK_THRESHOLD)
    }

    /// Get the remote name.
    ///
    /// Defaults to "origin" if not configured.
    pub fn remote(&self) -> &str {
        self.repo
            .as_ref()
            .and_then(|r| r.remote.as_deref())
            .or(self.global.remote.as_deref())
            .unwrap_or("origin")
    }

    /// Credentials for remote transport.
    ///
    /// Defaults to ssh with the `~/.ssh/id_rsa` key pair.
    pub fn credentials(&self) -> CredentialSpec {
        self.repo
            .as_ref()
            .and_then(|r| r.credentials.clone())
            .or_else(|| self.global.credentials.clone())
            .unwrap_or_default()
    }

    /// Commit identity used when git config has none.
    pub fn identity(&self) -> Option<&Identity> {
        self.repo
            .as_ref()
            .and_then(|r| r.identity.as_ref())
            .or(self.global.identity.as_ref())
    }

    /// Whether host certificates are accepted unchecked.
    ///
    /// Defaults to `false` if not configured.
    pub fn skip_certificate_check(&self) -> bool {
        self.repo
            .as_ref()
            .and_then(|r| r.transport.as_ref())
            .and_then(|t| t.skip_certificate_check)
            .or_else(|| {
                self.global
                    .transport
                    .as_ref()
                    .and_then(|t| t.skip_certificate_check)
            })
            .unwrap_or(false)
    }

    /// Transport built from the configured credentials and certificate policy.
    pub fn transport(&self) -> Transport {
        Transport {
            credentials: self.credentials(),
            skip_certificate_check: self.skip_certificate_check(),
        }
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded repo config file.
    pub fn repo_config_loaded_from(&self) -> Option<&Path> {
        self.repo_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo_with_config(contents: &str) -> TempDir {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".git/gitfacade");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.toml"), contents).unwrap();
        temp
    }

    #[test]
    fn load_empty_defaults() {
        let result = Config::load_from(None, None).unwrap();
        let config = result.config;

        assert_eq!(config.remote(), "origin");
        assert_eq!(config.leak_threshold(), DEFAULT_LEAK_THRESHOLD);
        assert_eq!(config.credentials(), CredentialSpec::default());
        assert!(config.identity().is_none());
        assert!(!config.skip_certificate_check());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn load_global_from_path() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
            leak_threshold = 3

            [credentials]
            kind = "anonymous"
            "#,
        )
        .unwrap();

        let config = Config::load_from(Some(config_path.as_path()), None).unwrap().config;

        assert_eq!(config.leak_threshold(), 3);
        assert_eq!(config.credentials(), CredentialSpec::Anonymous);
        assert_eq!(config.global_config_loaded_from(), Some(config_path.as_path()));
    }

    #[test]
    fn missing_global_path_is_defaults() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_from(Some(temp.path().join("nope.toml").as_path()), None)
            .unwrap()
            .config;
        assert!(config.global_config_loaded_from().is_none());
    }

    #[test]
    fn load_repo_config() {
        let temp = repo_with_config(
            r#"
            remote = "upstream"

            [identity]
            name = "Repo Bot"
            email = "repo@example.com"
            "#,
        );

        let result = Config::load_from(None, Some(temp.path())).unwrap();
        let config = result.config;

        assert_eq!(config.remote(), "upstream");
        assert_eq!(config.identity().map(|i| i.name.as_str()), Some("Repo Bot"));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn http_password_in_repo_warns() {
        let temp = repo_with_config(
            r#"
            [credentials]
            kind = "http"
            username = "bot"
            password = "pw"
            "#,
        );

        let result = Config::load_from(None, Some(temp.path())).unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].message.contains("plain text"));
    }

    #[test]
    fn write_repo_config_atomic() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".git")).unwrap();

        let config = RepoConfig {
            remote: Some("mirror".to_string()),
            ..Default::default()
        };

        let path = Config::write_repo(temp.path(), &config).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("toml.tmp").exists());
        let loaded = Config::load_from(None, Some(temp.path())).unwrap();
        assert_eq!(loaded.config.remote(), "mirror");
    }

    #[test]
    fn write_rejects_invalid() {
        let temp = TempDir::new().unwrap();
        let config = RepoConfig {
            remote: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(Config::write_repo(temp.path(), &config).is_err());
    }

    #[test]
    fn unknown_fields_rejected() {
        let temp = repo_with_config(
            r#"
            remote = "origin"
            unknown_field = true
            "#,
        );

        let result = Config::load_from(None, Some(temp.path()));
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn precedence_repo_overrides_global() {
        let config = Config {
            global: GlobalConfig {
                remote: Some("global-remote".to_string()),
                credentials: Some(CredentialSpec::Anonymous),
                transport: Some(TransportConfig {
                    skip_certificate_check: Some(true),
                }),
                ..Default::default()
            },
            repo: Some(RepoConfig {
                remote: Some("upstream".to_string()),
                transport: Some(TransportConfig {
                    skip_certificate_check: Some(false),
                }),
                ..Default::default()
            }),
            global_path: None,
            repo_path: None,
        };

        assert_eq!(config.remote(), "upstream");
        assert_eq!(config.credentials(), CredentialSpec::Anonymous);
        assert!(!config.skip_certificate_check());

        let transport = config.transport();
        assert_eq!(transport.credentials, CredentialSpec::Anonymous);
        assert!(!transport.skip_certificate_check);
    }
}
