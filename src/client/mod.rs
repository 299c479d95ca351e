//! client
//!
//! Async facade over the git engine with guaranteed handle release.
//!
//! # Architecture
//!
//! Every [`RepositoryClient`] operation is its own bracket:
//!
//! 1. construct a fresh [`RepositoryHandle`] for the client's directory
//! 2. open it (registered with the [`HandleRegistry`], conflict-checked)
//! 3. delegate to [`Git`]
//! 4. free the handle, whatever the outcome
//!
//! The bracket runs on tokio's blocking pool. The handle lives inside the
//! blocking closure, so it is released even if the awaiting future is
//! dropped or the delegated call panics.
//!
//! Operations on one client are meant to be awaited one at a time; no
//! ordering is guaranteed between clients sharing a directory.
//!
//! # Example
//!
//! ```no_run
//! use gitfacade::client::RepositoryClient;
//!
//! # async fn demo() -> Result<(), gitfacade::client::ClientError> {
//! let client = RepositoryClient::new("/tmp/work", None);
//! client.init().await?;
//! client.add("*.txt").await?;
//! let oid = client.commit("initial import").await?;
//! println!("committed {}", oid.short(7));
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::core::config::Config;
use crate::core::credentials::CredentialSpec;
use crate::core::handle::{HandleError, RepositoryHandle};
use crate::core::registry::HandleRegistry;
use crate::core::types::{BranchName, Identity, Oid, Pathspec};
use crate::git::{
    BranchEntry, CheckoutOutcome, Git, GitError, PullOutcome, PushOutcome, StatusEntry, Transport,
};

/// Errors from client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Handle lifecycle failure (already open, not a repository, ...).
    #[error(transparent)]
    Handle(#[from] HandleError),

    /// The delegated git operation failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// The blocking task panicked or was cancelled.
    #[error("{operation} did not complete")]
    Task {
        operation: &'static str,
        #[source]
        source: tokio::task::JoinError,
    },
}

/// Repository operations against one working directory.
#[derive(Debug, Clone)]
pub struct RepositoryClient {
    dir: PathBuf,
    transport: Transport,
    identity: Option<Identity>,
    default_remote: String,
    registry: Arc<HandleRegistry>,
}

impl RepositoryClient {
    /// Client for `dir` using the global handle registry.
    ///
    /// `credentials` defaults to ssh with the `~/.ssh/id_rsa` key pair.
    pub fn new(dir: impl Into<PathBuf>, credentials: Option<CredentialSpec>) -> Self {
        Self {
            dir: dir.into(),
            transport: Transport::new(credentials.unwrap_or_default()),
            identity: None,
            default_remote: "origin".to_string(),
            registry: HandleRegistry::global(),
        }
    }

    /// Client for `dir` with credentials, remote, identity and transport
    /// settings taken from `config`.
    pub fn from_config(dir: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            dir: dir.into(),
            transport: config.transport(),
            identity: config.identity().cloned(),
            default_remote: config.remote().to_string(),
            registry: HandleRegistry::global(),
        }
    }

    /// Account handles in `registry` instead of the global one.
    pub fn with_registry(mut self, registry: Arc<HandleRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Commit identity used when git config has none.
    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Remote used by fetch, push and checkout when none is given.
    pub fn with_default_remote(mut self, remote: impl Into<String>) -> Self {
        self.default_remote = remote.into();
        self
    }

    /// Replace the credentials while keeping other transport settings.
    pub fn with_credentials(mut self, credentials: CredentialSpec) -> Self {
        self.transport.credentials = credentials;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn registry(&self) -> &Arc<HandleRegistry> {
        &self.registry
    }

    pub fn default_remote(&self) -> &str {
        &self.default_remote
    }

    // =========================================================================
    // Bracketing
    // =========================================================================

    /// Run `f` on the blocking pool, mapping a join failure.
    async fn blocking<T, F>(operation: &'static str, f: F) -> Result<T, ClientError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, ClientError> + Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|source| ClientError::Task { operation, source })?
    }

    /// Open a fresh handle, run `f` against it, and free it.
    async fn with_handle<T, F>(&self, operation: &'static str, f: F) -> Result<T, ClientError>
    where
        T: Send + 'static,
        F: FnOnce(&Git) -> Result<T, GitError> + Send + 'static,
    {
        let mut handle = RepositoryHandle::new(self.dir.clone(), Arc::clone(&self.registry));
        Self::blocking(operation, move || {
            handle.open()?;
            tracing::debug!(handle = %handle.id(), operation, "delegating");
            let result = f(handle.git()?).map_err(ClientError::from);
            handle.free();
            result
        })
        .await
    }

    // =========================================================================
    // Repository lifecycle
    // =========================================================================

    /// Create a repository in the client's directory.
    pub async fn init(&self) -> Result<(), ClientError> {
        let dir = self.dir.clone();
        Self::blocking("init", move || {
            Git::init(&dir)?;
            Ok(())
        })
        .await
    }

    /// Clone `url` into the client's directory.
    ///
    /// Checks out `branch` when given, otherwise the remote's default branch.
    pub async fn clone_from(
        &self,
        url: &str,
        branch: Option<BranchName>,
    ) -> Result<(), ClientError> {
        let dir = self.dir.clone();
        let url = url.to_string();
        let transport = self.transport.clone();
        Self::blocking("clone", move || {
            Git::clone(&url, branch.as_ref(), &dir, &transport)?;
            Ok(())
        })
        .await
    }

    // =========================================================================
    // Remote operations
    // =========================================================================

    /// Fetch one remote, the default remote when `remote` is `None`.
    pub async fn fetch(&self, remote: Option<&str>) -> Result<(), ClientError> {
        let remote = remote.unwrap_or(&self.default_remote).to_string();
        let transport = self.transport.clone();
        self.with_handle("fetch", move |git| git.fetch(&remote, &transport))
            .await
    }

    /// Fetch every configured remote. Returns the remotes fetched.
    pub async fn fetch_all(&self) -> Result<Vec<String>, ClientError> {
        let transport = self.transport.clone();
        self.with_handle("fetch", move |git| git.fetch_all(&transport))
            .await
    }

    /// Fetch all remotes and merge the upstream into the current branch.
    pub async fn pull(&self) -> Result<PullOutcome, ClientError> {
        let transport = self.transport.clone();
        let identity = self.identity.clone();
        self.with_handle("pull", move |git| git.pull(&transport, identity.as_ref()))
            .await
    }

    /// Push the current branch.
    pub async fn push(&self, remote: Option<&str>) -> Result<PushOutcome, ClientError> {
        let remote = remote.map(String::from);
        let default_remote = self.default_remote.clone();
        let transport = self.transport.clone();
        self.with_handle("push", move |git| {
            git.push(remote.as_deref(), &default_remote, &transport)
        })
        .await
    }

    // =========================================================================
    // Index and commits
    // =========================================================================

    /// Stage paths matching `pathspec`.
    pub async fn add(&self, pathspec: impl Into<Pathspec>) -> Result<(), ClientError> {
        let pathspec = pathspec.into();
        self.with_handle("add", move |git| git.add(&pathspec)).await
    }

    /// Remove paths matching `pathspec` from the index.
    pub async fn remove(&self, pathspec: impl Into<Pathspec>) -> Result<(), ClientError> {
        let pathspec = pathspec.into();
        self.with_handle("remove", move |git| git.remove(&pathspec))
            .await
    }

    /// Unstage paths matching `pathspec` back to HEAD.
    pub async fn reset(&self, pathspec: impl Into<Pathspec>) -> Result<(), ClientError> {
        let pathspec = pathspec.into();
        self.with_handle("reset", move |git| git.reset(&pathspec)).await
    }

    /// Commit the index. Returns the new commit id.
    pub async fn commit(&self, message: &str) -> Result<Oid, ClientError> {
        let message = message.to_string();
        let identity = self.identity.clone();
        self.with_handle("commit", move |git| {
            git.commit(&message, identity.as_ref())
        })
        .await
    }

    /// Switch to `branch`, creating it from a remote branch if needed.
    pub async fn checkout(
        &self,
        branch: &BranchName,
        remote: Option<&str>,
    ) -> Result<CheckoutOutcome, ClientError> {
        let branch = branch.clone();
        let remote = remote.map(String::from);
        let default_remote = self.default_remote.clone();
        self.with_handle("checkout", move |git| {
            git.checkout(&branch, remote.as_deref(), &default_remote)
        })
        .await
    }

    // =========================================================================
    // Queries and upstream configuration
    // =========================================================================

    pub async fn status(&self, include_untracked: bool) -> Result<Vec<StatusEntry>, ClientError> {
        self.with_handle("status", move |git| git.status(include_untracked))
            .await
    }

    pub async fn branches(&self) -> Result<Vec<BranchEntry>, ClientError> {
        self.with_handle("branches", |git| git.branches()).await
    }

    /// The current branch, `None` when HEAD is detached.
    pub async fn current_branch(&self) -> Result<Option<BranchName>, ClientError> {
        self.with_handle("current branch", |git| git.current_branch())
            .await
    }

    /// Set (or with `None`, clear) the upstream of `branch`.
    pub async fn set_upstream(
        &self,
        branch: &BranchName,
        upstream: Option<&str>,
    ) -> Result<(), ClientError> {
        let branch = branch.clone();
        let upstream = upstream.map(String::from);
        self.with_handle("set upstream", move |git| {
            git.set_upstream(&branch, upstream.as_deref())
        })
        .await
    }

    /// Set the upstream of the current branch. Returns that branch.
    pub async fn set_current_upstream(
        &self,
        upstream: Option<&str>,
    ) -> Result<BranchName, ClientError> {
        let upstream = upstream.map(String::from);
        self.with_handle("set upstream", move |git| {
            git.set_current_upstream(upstream.as_deref())
        })
        .await
    }

    /// Merged git configuration entries.
    pub async fn git_config(&self) -> Result<BTreeMap<String, String>, ClientError> {
        self.with_handle("git config", |git| git.config_entries())
            .await
    }
}
