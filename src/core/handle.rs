//! core::handle
//!
//! One logical session against a repository root.
//!
//! # Architecture
//!
//! A [`RepositoryHandle`] pairs a fresh [`HandleId`] with a repository root.
//! Opening it registers the id with a [`HandleRegistry`] and opens the native
//! repository; freeing it drops the native repository and deregisters the id.
//!
//! ```text
//! Unopened --open--> Open --free--> Released
//!     |                                ^
//!     +-------------free---------------+
//! ```
//!
//! # Invariants
//!
//! - The native repository is present iff the state is `Open`
//! - A failed open leaves the registry as it was and the handle `Unopened`
//! - `Released` is terminal
//! - The handle is freed on drop (RAII pattern), so an early return, a `?`
//!   or a panic between open and free still releases it
//!
//! # Example
//!
//! ```ignore
//! use gitfacade::core::handle::RepositoryHandle;
//! use gitfacade::core::registry::HandleRegistry;
//!
//! let mut handle = RepositoryHandle::new("/path/to/repo", HandleRegistry::global());
//! handle.open()?;
//! let branches = handle.git()?.branches()?;
//! handle.free();
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::core::registry::{HandleRegistry, RegistryError};
use crate::core::types::HandleId;
use crate::git::{Git, GitError};

/// Errors from handle lifecycle operations.
#[derive(Debug, Error)]
pub enum HandleError {
    /// The handle id is already registered as open.
    #[error("repository handle {id} is already open")]
    AlreadyOpen { id: HandleId },

    /// The handle has not been opened, or was already freed.
    #[error("repository handle {id} is not open")]
    NotOpen { id: HandleId },

    /// The handle was freed and cannot be opened again.
    #[error("repository handle {id} was released and cannot be reopened")]
    Released { id: HandleId },

    /// The root is not a git repository.
    #[error("not a git repository: {path}")]
    NotARepository { path: PathBuf },

    /// The root is a bare repository.
    #[error("bare repository not supported: {path}")]
    BareRepository { path: PathBuf },

    /// libgit2 failed to open the root for another reason.
    #[error("failed to open {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: GitError,
    },
}

impl From<RegistryError> for HandleError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::AlreadyOpen { id } => HandleError::AlreadyOpen { id },
        }
    }
}

/// Lifecycle state of a [`RepositoryHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Unopened,
    Open,
    Released,
}

/// A single open/free bracket around a native repository.
pub struct RepositoryHandle {
    id: HandleId,
    root: PathBuf,
    registry: Arc<HandleRegistry>,
    state: HandleState,
    git: Option<Git>,
}

impl RepositoryHandle {
    /// Create an unopened handle for `root` with a fresh id.
    pub fn new(root: impl Into<PathBuf>, registry: Arc<HandleRegistry>) -> Self {
        Self::with_id(HandleId::next(), root, registry)
    }

    /// Create an unopened handle with an explicit id.
    ///
    /// Two handles sharing an id model two sessions claiming the same
    /// identity; the registry lets only one of them be open.
    pub fn with_id(id: HandleId, root: impl Into<PathBuf>, registry: Arc<HandleRegistry>) -> Self {
        Self {
            id,
            root: root.into(),
            registry,
            state: HandleState::Unopened,
            git: None,
        }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == HandleState::Open
    }

    /// Register the handle and open the native repository at the root.
    ///
    /// # Errors
    ///
    /// - [`HandleError::Released`] if the handle was already freed
    /// - [`HandleError::AlreadyOpen`] if the id is registered (including by
    ///   this handle); the registry is unchanged
    /// - [`HandleError::NotARepository`] / [`HandleError::BareRepository`] /
    ///   [`HandleError::Open`] if the root cannot be opened; the id is
    ///   deregistered again and the handle stays `Unopened`
    pub fn open(&mut self) -> Result<(), HandleError> {
        if self.state == HandleState::Released {
            return Err(HandleError::Released { id: self.id });
        }

        let registration = self.registry.register(self.id)?;

        match Git::open(&self.root) {
            Ok(git) => {
                self.git = Some(git);
                self.state = HandleState::Open;
                tracing::debug!(
                    handle = %self.id,
                    root = %self.root.display(),
                    open = registration.open_count,
                    "opened repository handle"
                );
                Ok(())
            }
            Err(err) => {
                self.registry.deregister(self.id);
                Err(match err {
                    GitError::NotARepo { path } => HandleError::NotARepository { path },
                    GitError::BareRepo { path } => HandleError::BareRepository { path },
                    source => HandleError::Open {
                        path: self.root.clone(),
                        source,
                    },
                })
            }
        }
    }

    /// Release the native repository and, if open, deregister the id.
    ///
    /// Safe to call in any state, any number of times.
    pub fn free(&mut self) {
        if self.state == HandleState::Released {
            return;
        }

        // Only an open handle holds a registration; an unopened one may
        // share its id with a live handle.
        let was_open = self.state == HandleState::Open;
        self.git = None;
        self.state = HandleState::Released;

        if was_open {
            self.registry.deregister(self.id);
            tracing::debug!(handle = %self.id, "freed repository handle");
        }
    }

    /// The open native repository.
    ///
    /// # Errors
    ///
    /// - [`HandleError::NotOpen`] unless the handle is `Open`
    pub fn git(&self) -> Result<&Git, HandleError> {
        self.git.as_ref().ok_or(HandleError::NotOpen { id: self.id })
    }
}

impl Drop for RepositoryHandle {
    fn drop(&mut self) {
        self.free();
    }
}

impl std::fmt::Debug for RepositoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryHandle")
            .field("id", &self.id)
            .field("root", &self.root)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init_repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        Git::init(dir.path()).unwrap();
        dir
    }

    mod open {
        use super::*;

        #[test]
        fn registers_and_exposes_git() {
            let dir = init_repo();
            let registry = Arc::new(HandleRegistry::new());
            let mut handle = RepositoryHandle::new(dir.path(), registry.clone());

            handle.open().unwrap();

            assert!(handle.is_open());
            assert!(registry.contains(handle.id()));
            assert!(handle.git().is_ok());
        }

        #[test]
        fn double_open_rejected() {
            let dir = init_repo();
            let registry = Arc::new(HandleRegistry::new());
            let mut handle = RepositoryHandle::new(dir.path(), registry.clone());

            handle.open().unwrap();
            let err = handle.open().unwrap_err();

            assert!(matches!(err, HandleError::AlreadyOpen { id } if id == handle.id()));
            assert_eq!(registry.size(), 1);
            assert!(handle.is_open());
        }

        #[test]
        fn shared_id_rejected_across_handles() {
            let dir = init_repo();
            let registry = Arc::new(HandleRegistry::new());
            let id = HandleId::next();
            let mut first = RepositoryHandle::with_id(id, dir.path(), registry.clone());
            let mut second = RepositoryHandle::with_id(id, dir.path(), registry.clone());

            first.open().unwrap();
            assert!(matches!(second.open(), Err(HandleError::AlreadyOpen { .. })));
            assert_eq!(second.state(), HandleState::Unopened);
            assert_eq!(registry.size(), 1);

            drop(second);
            assert!(first.is_open());
            assert!(registry.contains(id));
            assert_eq!(registry.size(), 1);

            // The id is still held, so a third claimant is still rejected.
            let mut third = RepositoryHandle::with_id(id, dir.path(), registry.clone());
            assert!(matches!(third.open(), Err(HandleError::AlreadyOpen { .. })));

            first.free();
            assert!(!registry.contains(id));
        }

        #[test]
        fn freeing_rejected_handle_keeps_owner_registered() {
            let dir = init_repo();
            let registry = Arc::new(HandleRegistry::new());
            let id = HandleId::next();
            let mut owner = RepositoryHandle::with_id(id, dir.path(), registry.clone());
            let mut other = RepositoryHandle::with_id(id, dir.path(), registry.clone());

            owner.open().unwrap();
            other.open().unwrap_err();
            other.free();

            assert_eq!(other.state(), HandleState::Released);
            assert!(registry.contains(id));
            assert!(owner.git().is_ok());
        }

        #[test]
        fn non_repository_leaves_registry_untouched() {
            let dir = TempDir::new().unwrap();
            let registry = Arc::new(HandleRegistry::new());
            let mut handle = RepositoryHandle::new(dir.path(), registry.clone());

            let err = handle.open().unwrap_err();

            assert!(matches!(err, HandleError::NotARepository { .. }));
            assert_eq!(registry.size(), 0);
            assert_eq!(handle.state(), HandleState::Unopened);
        }

        #[test]
        fn retry_after_failed_open() {
            let dir = TempDir::new().unwrap();
            let registry = Arc::new(HandleRegistry::new());
            let mut handle = RepositoryHandle::new(dir.path(), registry.clone());

            assert!(handle.open().is_err());
            Git::init(dir.path()).unwrap();
            handle.open().unwrap();
            assert_eq!(registry.size(), 1);
        }

        #[test]
        fn bare_repository_rejected() {
            let dir = TempDir::new().unwrap();
            git2::Repository::init_bare(dir.path()).unwrap();
            let registry = Arc::new(HandleRegistry::new());
            let mut handle = RepositoryHandle::new(dir.path(), registry.clone());

            assert!(matches!(
                handle.open(),
                Err(HandleError::BareRepository { .. })
            ));
            assert_eq!(registry.size(), 0);
        }

        #[test]
        fn released_cannot_reopen() {
            let dir = init_repo();
            let registry = Arc::new(HandleRegistry::new());
            let mut handle = RepositoryHandle::new(dir.path(), registry.clone());

            handle.open().unwrap();
            handle.free();

            assert!(matches!(handle.open(), Err(HandleError::Released { .. })));
            assert_eq!(registry.size(), 0);
        }
    }

    mod free {
        use super::*;

        #[test]
        fn idempotent() {
            let dir = init_repo();
            let registry = Arc::new(HandleRegistry::new());
            let mut handle = RepositoryHandle::new(dir.path(), registry.clone());

            handle.open().unwrap();
            handle.free();
            handle.free();

            assert_eq!(handle.state(), HandleState::Released);
            assert_eq!(registry.size(), 0);
            assert!(matches!(handle.git(), Err(HandleError::NotOpen { .. })));
        }

        #[test]
        fn never_opened_is_noop() {
            let registry = Arc::new(HandleRegistry::new());
            let mut handle = RepositoryHandle::new("/nonexistent", registry.clone());

            handle.free();

            assert_eq!(handle.state(), HandleState::Released);
            assert_eq!(registry.size(), 0);
        }

        #[test]
        fn drop_deregisters() {
            let dir = init_repo();
            let registry = Arc::new(HandleRegistry::new());
            {
                let mut handle = RepositoryHandle::new(dir.path(), registry.clone());
                handle.open().unwrap();
                assert_eq!(registry.size(), 1);
            }
            assert_eq!(registry.size(), 0);
        }

        #[test]
        fn panic_between_open_and_free_still_releases() {
            let dir = init_repo();
            let registry = Arc::new(HandleRegistry::new());
            let path = dir.path().to_path_buf();
            let inner = registry.clone();

            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
                let mut handle = RepositoryHandle::new(path, inner);
                handle.open().unwrap();
                panic!("delegated operation blew up");
            }));

            assert!(result.is_err());
            assert_eq!(registry.size(), 0);
        }
    }

    #[test]
    fn git_before_open_is_not_open() {
        let handle = RepositoryHandle::new("/nonexistent", Arc::new(HandleRegistry::new()));
        assert!(matches!(handle.git(), Err(HandleError::NotOpen { .. })));
    }
}
