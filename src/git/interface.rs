//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module provides the **single doorway** to all Git operations in
//! gitfacade. Every repository read and write flows through [`Git`], which
//! returns structured results and normalizes failures into [`GitError`].
//!
//! # Error Handling
//!
//! Failures the facade itself detects get their own variants:
//! - [`GitError::NotARepo`]: path is not a repository
//! - [`GitError::DetachedHead`]: pull/push/upstream on a detached HEAD
//! - [`GitError::NoUpstream`]: pull on a branch without upstream
//! - [`GitError::MergeConflict`]: pull left conflicts in the index
//!
//! Everything libgit2 reports is passed through unchanged as
//! [`GitError::Engine`], with a short context string naming the step.
//!
//! # Example
//!
//! ```ignore
//! use gitfacade::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! for entry in git.status(true)? {
//!     println!("{} {:?}", entry.path, entry.status);
//! }
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{BranchType, ErrorCode, IndexAddOption, StatusOptions};
use serde::Serialize;
use thiserror::Error;

use super::transport::Transport;
use crate::core::types::{BranchName, Identity, Oid, Pathspec, TypeError};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Path is not a git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was opened
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported: {path}")]
    BareRepo {
        /// The path that was opened
        path: PathBuf,
    },

    /// HEAD points at a commit instead of a branch.
    #[error("HEAD is not pointing to a branch, cannot {operation}")]
    DetachedHead {
        /// The operation that was refused
        operation: &'static str,
    },

    /// Current branch has no upstream to pull from.
    #[error("branch '{branch}' has no upstream configured")]
    NoUpstream {
        /// The local branch
        branch: String,
    },

    /// Named remote does not exist.
    #[error("remote not found: {name}")]
    RemoteNotFound {
        /// The remote name
        name: String,
    },

    /// Branch exists neither locally nor on a remote.
    #[error("branch not found: {name}")]
    BranchNotFound {
        /// The branch name
        name: String,
    },

    /// Merge stopped with conflicted paths; the index is left conflicted.
    #[error("merging {upstream} into {branch} produced conflicts in: {}", paths.join(", "))]
    MergeConflict {
        /// The local branch
        branch: String,
        /// The upstream being merged
        upstream: String,
        /// Conflicted paths
        paths: Vec<String>,
    },

    /// Remote refused a pushed ref.
    #[error("push of {refname} rejected: {message}")]
    PushRejected {
        /// The remote ref
        refname: String,
        /// Message from the remote
        message: String,
    },

    /// Commit message is empty or whitespace.
    #[error("commit message cannot be empty")]
    EmptyCommitMessage,

    /// No author identity in git config and no fallback configured.
    #[error("no commit identity: set user.name and user.email, or [identity] in gitfacade config")]
    MissingIdentity,

    /// Pathspec has no usable pattern.
    #[error("pathspec cannot be empty")]
    EmptyPathspec,

    /// A name read from or given to the repository failed validation.
    #[error(transparent)]
    InvalidName(#[from] TypeError),

    /// Error reported by libgit2, passed through verbatim.
    #[error("{context}: {source}")]
    Engine {
        /// The step that failed
        context: String,
        /// The libgit2 error
        source: git2::Error,
    },
}

impl GitError {
    /// Wrap a libgit2 error with the step that produced it.
    fn engine(context: impl Into<String>) -> impl FnOnce(git2::Error) -> GitError {
        let context = context.into();
        move |source| GitError::Engine { context, source }
    }

    /// The raw libgit2 message, for engine errors.
    pub fn engine_message(&self) -> Option<&str> {
        match self {
            GitError::Engine { source, .. } => Some(source.message()),
            _ => None,
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(source: git2::Error) -> Self {
        GitError::Engine {
            context: "git".to_string(),
            source,
        }
    }
}

/// One status flag of a path.
///
/// Serialized with libgit2's names (`INDEX_NEW`, `WT_MODIFIED`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusFlag {
    IndexNew,
    IndexModified,
    IndexDeleted,
    IndexRenamed,
    IndexTypechange,
    WtNew,
    WtModified,
    WtDeleted,
    WtTypechange,
    WtRenamed,
    WtUnreadable,
    Ignored,
    Conflicted,
}

impl StatusFlag {
    /// Flags in reporting order, with their libgit2 bit.
    const TABLE: [(git2::Status, StatusFlag); 13] = [
        (git2::Status::INDEX_NEW, StatusFlag::IndexNew),
        (git2::Status::INDEX_MODIFIED, StatusFlag::IndexModified),
        (git2::Status::INDEX_DELETED, StatusFlag::IndexDeleted),
        (git2::Status::INDEX_RENAMED, StatusFlag::IndexRenamed),
        (git2::Status::INDEX_TYPECHANGE, StatusFlag::IndexTypechange),
        (git2::Status::WT_NEW, StatusFlag::WtNew),
        (git2::Status::WT_MODIFIED, StatusFlag::WtModified),
        (git2::Status::WT_DELETED, StatusFlag::WtDeleted),
        (git2::Status::WT_TYPECHANGE, StatusFlag::WtTypechange),
        (git2::Status::WT_RENAMED, StatusFlag::WtRenamed),
        (git2::Status::WT_UNREADABLE, StatusFlag::WtUnreadable),
        (git2::Status::IGNORED, StatusFlag::Ignored),
        (git2::Status::CONFLICTED, StatusFlag::Conflicted),
    ];

    fn from_status(status: git2::Status) -> Vec<StatusFlag> {
        Self::TABLE
            .iter()
            .filter(|(bit, _)| status.contains(*bit))
            .map(|(_, flag)| *flag)
            .collect()
    }

    /// The libgit2 name of this flag.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFlag::IndexNew => "INDEX_NEW",
            StatusFlag::IndexModified => "INDEX_MODIFIED",
            StatusFlag::IndexDeleted => "INDEX_DELETED",
            StatusFlag::IndexRenamed => "INDEX_RENAMED",
            StatusFlag::IndexTypechange => "INDEX_TYPECHANGE",
            StatusFlag::WtNew => "WT_NEW",
            StatusFlag::WtModified => "WT_MODIFIED",
            StatusFlag::WtDeleted => "WT_DELETED",
            StatusFlag::WtTypechange => "WT_TYPECHANGE",
            StatusFlag::WtRenamed => "WT_RENAMED",
            StatusFlag::WtUnreadable => "WT_UNREADABLE",
            StatusFlag::Ignored => "IGNORED",
            StatusFlag::Conflicted => "CONFLICTED",
        }
    }
}

impl std::fmt::Display for StatusFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one path relative to HEAD and the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    /// Path relative to the repository root
    pub path: String,
    /// Flags, index flags first
    pub status: Vec<StatusFlag>,
}

/// A local branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchEntry {
    /// Full ref name (`refs/heads/main`)
    #[serde(rename = "ref")]
    pub refname: String,
    /// Short name (`main`)
    pub name: String,
    /// Whether HEAD points at this branch
    pub is_head: bool,
}

/// What a pull did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PullOutcome {
    /// Branch already contains the upstream.
    UpToDate,
    /// Branch ref moved forward to the upstream commit.
    FastForward { to: Oid },
    /// A merge commit was created.
    Merged { commit: Oid },
}

/// What a push did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushOutcome {
    /// Remote pushed to
    pub remote: String,
    /// Refspec pushed (`refs/heads/x:refs/heads/x`)
    pub refspec: String,
    /// Whether an upstream was configured by this push
    pub upstream_set: bool,
}

/// What a checkout did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutOutcome {
    /// Branch now checked out
    pub branch: BranchName,
    /// Remote branch the local branch was created from, if it was created
    pub created_from: Option<String>,
}

/// The Git interface.
///
/// This is the **single point of interaction** with libgit2. No other
/// module imports `git2` directly.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Creation and Opening
    // =========================================================================

    /// Create (or reinitialize) a repository at `path`.
    ///
    /// Creates the directory if needed. Safe on an existing directory that
    /// is not yet a repository.
    pub fn init(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::init(path)
            .map_err(GitError::engine(format!("init {}", path.display())))?;
        tracing::debug!(path = %path.display(), "initialized repository");
        Ok(Self { repo })
    }

    /// Clone `url` into `target`.
    ///
    /// Checks out `branch` when given, otherwise the remote's default branch.
    pub fn clone(
        url: &str,
        branch: Option<&BranchName>,
        target: &Path,
        transport: &Transport,
    ) -> Result<Self, GitError> {
        let mut builder = RepoBuilder::new();
        builder.fetch_options(transport.fetch_options());
        if let Some(branch) = branch {
            builder.branch(branch.as_str());
        }

        let repo = builder
            .clone(url, target)
            .map_err(GitError::engine(format!("clone {}", url)))?;
        tracing::info!(url, target = %target.display(), "cloned repository");
        Ok(Self { repo })
    }

    /// Open the repository whose working directory is exactly `path`.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if `path` is not a repository
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::open(path).map_err(|e| match e.code() {
            ErrorCode::NotFound => GitError::NotARepo {
                path: path.to_path_buf(),
            },
            _ => GitError::engine(format!("open {}", path.display()))(e),
        })?;

        if repo.is_bare() {
            return Err(GitError::BareRepo {
                path: path.to_path_buf(),
            });
        }

        Ok(Self { repo })
    }

    // =========================================================================
    // HEAD and Branches
    // =========================================================================

    /// The branch HEAD points at, or `None` when detached.
    ///
    /// On a fresh repository (unborn HEAD) this is the branch the first
    /// commit will create.
    pub fn current_branch(&self) -> Result<Option<BranchName>, GitError> {
        match self.repo.head() {
            Ok(head) if head.is_branch() => match head.shorthand() {
                Some(name) => Ok(Some(BranchName::new(name)?)),
                None => Ok(None),
            },
            Ok(_) => Ok(None),
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                let head = self
                    .repo
                    .find_reference("HEAD")
                    .map_err(GitError::engine("read HEAD"))?;
                match head
                    .symbolic_target()
                    .and_then(|t| t.strip_prefix("refs/heads/"))
                {
                    Some(name) => Ok(Some(BranchName::new(name)?)),
                    None => Ok(None),
                }
            }
            Err(e) => Err(GitError::engine("read HEAD")(e)),
        }
    }

    /// The current branch, refusing `operation` on a detached HEAD.
    fn require_branch(&self, operation: &'static str) -> Result<BranchName, GitError> {
        let detached = self
            .repo
            .head_detached()
            .map_err(GitError::engine("read HEAD"))?;
        if detached {
            return Err(GitError::DetachedHead { operation });
        }
        self.current_branch()?
            .ok_or(GitError::DetachedHead { operation })
    }

    /// The commit HEAD points at, or `None` on an unborn branch.
    fn head_commit(&self) -> Result<Option<git2::Commit<'_>>, GitError> {
        match self.repo.head() {
            Ok(head) => head
                .peel_to_commit()
                .map(Some)
                .map_err(GitError::engine("resolve HEAD commit")),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
            Err(e) => Err(GitError::engine("read HEAD")(e)),
        }
    }

    fn find_local_branch(&self, branch: &BranchName) -> Result<git2::Branch<'_>, GitError> {
        self.repo
            .find_branch(branch.as_str(), BranchType::Local)
            .map_err(|e| match e.code() {
                ErrorCode::NotFound => GitError::BranchNotFound {
                    name: branch.to_string(),
                },
                _ => GitError::engine(format!("find branch {}", branch))(e),
            })
    }

    /// List local branches, sorted by name.
    pub fn branches(&self) -> Result<Vec<BranchEntry>, GitError> {
        let iter = self
            .repo
            .branches(Some(BranchType::Local))
            .map_err(GitError::engine("list branches"))?;

        let mut entries = Vec::new();
        for item in iter {
            let (branch, _) = item.map_err(GitError::engine("list branches"))?;
            let reference = branch.get();
            let (Some(refname), Some(name)) = (reference.name(), reference.shorthand()) else {
                continue;
            };
            entries.push(BranchEntry {
                refname: refname.to_string(),
                name: name.to_string(),
                is_head: branch.is_head(),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Set (or with `None`, clear) the upstream of a local branch.
    ///
    /// `upstream` is a remote-tracking branch name such as `origin/main`.
    pub fn set_upstream(&self, branch: &BranchName, upstream: Option<&str>) -> Result<(), GitError> {
        let mut local = self.find_local_branch(branch)?;
        local
            .set_upstream(upstream)
            .map_err(GitError::engine(format!("set upstream of {}", branch)))?;
        tracing::debug!(branch = %branch, upstream, "upstream updated");
        Ok(())
    }

    /// Set the upstream of the current branch.
    pub fn set_current_upstream(&self, upstream: Option<&str>) -> Result<BranchName, GitError> {
        let branch = self.require_branch("set upstream")?;
        self.set_upstream(&branch, upstream)?;
        Ok(branch)
    }

    /// `(remote, merge ref)` configured for a local branch ref.
    fn upstream_config(&self, local_ref: &str) -> Result<Option<(String, String)>, GitError> {
        let remote = match self.repo.branch_upstream_remote(local_ref) {
            Ok(buf) => buf.as_str().map(String::from),
            Err(e) if e.code() == ErrorCode::NotFound => None,
            Err(e) => return Err(GitError::engine(format!("read upstream of {}", local_ref))(e)),
        };
        let merge = match self.repo.branch_upstream_merge(local_ref) {
            Ok(buf) => buf.as_str().map(String::from),
            Err(e) if e.code() == ErrorCode::NotFound => None,
            Err(e) => return Err(GitError::engine(format!("read upstream of {}", local_ref))(e)),
        };
        Ok(remote.zip(merge))
    }

    // =========================================================================
    // Remote Operations
    // =========================================================================

    /// Names of all configured remotes.
    pub fn remote_names(&self) -> Result<Vec<String>, GitError> {
        let remotes = self
            .repo
            .remotes()
            .map_err(GitError::engine("list remotes"))?;
        Ok(remotes.iter().flatten().map(String::from).collect())
    }

    fn find_remote(&self, name: &str) -> Result<git2::Remote<'_>, GitError> {
        self.repo.find_remote(name).map_err(|e| match e.code() {
            ErrorCode::NotFound | ErrorCode::InvalidSpec => GitError::RemoteNotFound {
                name: name.to_string(),
            },
            _ => GitError::engine(format!("find remote {}", name))(e),
        })
    }

    /// Fetch the configured refspecs of one remote.
    pub fn fetch(&self, remote_name: &str, transport: &Transport) -> Result<(), GitError> {
        let mut remote = self.find_remote(remote_name)?;
        let mut options = transport.fetch_options();
        remote
            .fetch(&[] as &[&str], Some(&mut options), None)
            .map_err(GitError::engine(format!("fetch {}", remote_name)))?;
        tracing::info!(remote = remote_name, "fetched");
        Ok(())
    }

    /// Fetch every configured remote. Returns the remotes fetched.
    pub fn fetch_all(&self, transport: &Transport) -> Result<Vec<String>, GitError> {
        let names = self.remote_names()?;
        for name in &names {
            self.fetch(name, transport)?;
        }
        Ok(names)
    }

    /// Fetch all remotes and merge the current branch's upstream into it.
    ///
    /// Refuses on a detached HEAD before touching the network.
    pub fn pull(
        &self,
        transport: &Transport,
        identity: Option<&Identity>,
    ) -> Result<PullOutcome, GitError> {
        let branch = self.require_branch("pull")?;
        self.fetch_all(transport)?;

        let local_ref = branch.local_ref();
        let local = self.repo.find_branch(branch.as_str(), BranchType::Local).ok();
        let upstream = match local.as_ref().map(|b| b.upstream()) {
            Some(Ok(upstream)) => upstream,
            Some(Err(e)) if e.code() != ErrorCode::NotFound => {
                return Err(GitError::engine(format!("read upstream of {}", branch))(e))
            }
            _ => {
                // Unborn branches have no ref yet but may still have config.
                let (remote, merge) =
                    self.upstream_config(&local_ref)?
                        .ok_or_else(|| GitError::NoUpstream {
                            branch: branch.to_string(),
                        })?;
                let short = merge.strip_prefix("refs/heads/").unwrap_or(&merge).to_string();
                self.repo
                    .find_branch(&format!("{}/{}", remote, short), BranchType::Remote)
                    .map_err(|_| GitError::NoUpstream {
                        branch: branch.to_string(),
                    })?
            }
        };

        let upstream_name = upstream
            .name()
            .ok()
            .flatten()
            .unwrap_or("upstream")
            .to_string();
        let theirs = self
            .repo
            .reference_to_annotated_commit(upstream.get())
            .map_err(GitError::engine(format!("resolve {}", upstream_name)))?;
        let (analysis, _) = self
            .repo
            .merge_analysis(&[&theirs])
            .map_err(GitError::engine("merge analysis"))?;

        if analysis.is_up_to_date() {
            tracing::debug!(branch = %branch, upstream = %upstream_name, "already up to date");
            return Ok(PullOutcome::UpToDate);
        }

        if analysis.is_fast_forward() || analysis.is_unborn() {
            let message = format!("pull: fast-forward to {}", upstream_name);
            // Checkout must run while HEAD still names the old tree, which
            // libgit2 uses as the baseline for a safe checkout.
            let target = self
                .repo
                .find_object(theirs.id(), None)
                .map_err(GitError::engine(format!("resolve {}", upstream_name)))?;
            self.repo
                .checkout_tree(&target, Some(CheckoutBuilder::new().safe()))
                .map_err(GitError::engine("checkout for fast-forward"))?;
            match self.repo.find_reference(&local_ref) {
                Ok(mut reference) => {
                    reference
                        .set_target(theirs.id(), &message)
                        .map_err(GitError::engine(format!("update {}", local_ref)))?;
                }
                Err(_) => {
                    self.repo
                        .reference(&local_ref, theirs.id(), true, &message)
                        .map_err(GitError::engine(format!("create {}", local_ref)))?;
                }
            }
            self.repo
                .set_head(&local_ref)
                .map_err(GitError::engine("set HEAD"))?;
            tracing::info!(branch = %branch, upstream = %upstream_name, "fast-forwarded");
            return Ok(PullOutcome::FastForward {
                to: to_oid(theirs.id())?,
            });
        }

        self.repo
            .merge(&[&theirs], None, None)
            .map_err(GitError::engine(format!("merge {}", upstream_name)))?;

        let mut index = self.repo.index().map_err(GitError::engine("read index"))?;
        if index.has_conflicts() {
            let paths = conflicted_paths(&index)?;
            return Err(GitError::MergeConflict {
                branch: branch.to_string(),
                upstream: upstream_name,
                paths,
            });
        }

        let tree_id = index
            .write_tree()
            .map_err(GitError::engine("write merge tree"))?;
        let tree = self
            .repo
            .find_tree(tree_id)
            .map_err(GitError::engine("read merge tree"))?;
        let signature = self.signature(identity)?;
        let ours = self
            .head_commit()?
            .ok_or_else(|| GitError::NoUpstream {
                branch: branch.to_string(),
            })?;
        let theirs_commit = self
            .repo
            .find_commit(theirs.id())
            .map_err(GitError::engine("read upstream commit"))?;
        let message = format!("Merge branch '{}' into {}", upstream_name, branch);
        let commit = self
            .repo
            .commit(
                Some("HEAD"),
                &signature,
                &signature,
                &message,
                &tree,
                &[&ours, &theirs_commit],
            )
            .map_err(GitError::engine("create merge commit"))?;
        self.repo
            .cleanup_state()
            .map_err(GitError::engine("clean up merge state"))?;

        tracing::info!(branch = %branch, upstream = %upstream_name, "merged");
        Ok(PullOutcome::Merged {
            commit: to_oid(commit)?,
        })
    }

    /// Push the current branch.
    ///
    /// The remote is `remote` when given, else the branch upstream's remote,
    /// else `default_remote`. Without an upstream the branch is pushed under
    /// its own name and the upstream is recorded afterwards.
    pub fn push(
        &self,
        remote: Option<&str>,
        default_remote: &str,
        transport: &Transport,
    ) -> Result<PushOutcome, GitError> {
        let branch = self.require_branch("push")?;
        let local_ref = branch.local_ref();
        let upstream = self.upstream_config(&local_ref)?;

        let (remote_name, remote_ref) = match (remote, upstream.as_ref()) {
            (Some(explicit), Some((up_remote, merge))) if explicit == up_remote => {
                (explicit.to_string(), merge.clone())
            }
            (Some(explicit), _) => (explicit.to_string(), local_ref.clone()),
            (None, Some((up_remote, merge))) => (up_remote.clone(), merge.clone()),
            (None, None) => (default_remote.to_string(), local_ref.clone()),
        };

        let mut git_remote = self.find_remote(&remote_name)?;
        let refspec = format!("{}:{}", local_ref, remote_ref);
        let rejected: RefCell<Option<(String, String)>> = RefCell::new(None);
        {
            let mut callbacks = transport.remote_callbacks();
            callbacks.push_update_reference(|refname, status| {
                if let Some(message) = status {
                    *rejected.borrow_mut() = Some((refname.to_string(), message.to_string()));
                }
                Ok(())
            });
            let mut options = Transport::push_options(callbacks);
            git_remote
                .push(&[refspec.as_str()], Some(&mut options))
                .map_err(GitError::engine(format!("push to {}", remote_name)))?;
        }
        if let Some((refname, message)) = rejected.into_inner() {
            return Err(GitError::PushRejected { refname, message });
        }

        let upstream_set = upstream.is_none() && self.record_upstream(&branch, &remote_name, &remote_ref);
        tracing::info!(remote = %remote_name, refspec = %refspec, "pushed");
        Ok(PushOutcome {
            remote: remote_name,
            refspec,
            upstream_set,
        })
    }

    /// Write `branch.<name>.remote`/`.merge`. Failure only logs: the push
    /// already succeeded.
    fn record_upstream(&self, branch: &BranchName, remote: &str, merge_ref: &str) -> bool {
        let result = self.repo.config().and_then(|mut config| {
            config.set_str(&format!("branch.{}.remote", branch), remote)?;
            config.set_str(&format!("branch.{}.merge", branch), merge_ref)
        });
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(branch = %branch, remote, error = %e, "pushed but could not record upstream");
                false
            }
        }
    }

    // =========================================================================
    // Index Operations
    // =========================================================================

    fn patterns(pathspec: &Pathspec) -> Result<Vec<&str>, GitError> {
        if pathspec.is_empty() {
            return Err(GitError::EmptyPathspec);
        }
        Ok(pathspec
            .patterns()
            .iter()
            .map(String::as_str)
            .filter(|p| !p.trim().is_empty())
            .collect())
    }

    fn index(&self) -> Result<git2::Index, GitError> {
        self.repo.index().map_err(GitError::engine("read index"))
    }

    /// Stage paths matching `pathspec`.
    ///
    /// Matching tracked paths that were deleted on disk are staged as
    /// removals.
    pub fn add(&self, pathspec: &Pathspec) -> Result<(), GitError> {
        let patterns = Self::patterns(pathspec)?;
        let mut index = self.index()?;
        index
            .add_all(patterns.iter().copied(), IndexAddOption::DEFAULT, None)
            .map_err(GitError::engine(format!("add {}", pathspec)))?;
        index
            .update_all(patterns.iter().copied(), None)
            .map_err(GitError::engine(format!("add {}", pathspec)))?;
        index.write().map_err(GitError::engine("write index"))?;
        Ok(())
    }

    /// Remove paths matching `pathspec` from the index.
    pub fn remove(&self, pathspec: &Pathspec) -> Result<(), GitError> {
        let patterns = Self::patterns(pathspec)?;
        let mut index = self.index()?;
        index
            .remove_all(patterns.iter().copied(), None)
            .map_err(GitError::engine(format!("remove {}", pathspec)))?;
        index.write().map_err(GitError::engine("write index"))?;
        Ok(())
    }

    /// Restore index entries matching `pathspec` to the HEAD commit.
    ///
    /// On an unborn branch the entries are simply unstaged.
    pub fn reset(&self, pathspec: &Pathspec) -> Result<(), GitError> {
        let patterns = Self::patterns(pathspec)?;
        let head = self.head_commit()?;
        self.repo
            .reset_default(head.as_ref().map(|c| c.as_object()), patterns.iter().copied())
            .map_err(GitError::engine(format!("reset {}", pathspec)))?;
        Ok(())
    }

    // =========================================================================
    // Commits and Checkout
    // =========================================================================

    fn signature(&self, fallback: Option<&Identity>) -> Result<git2::Signature<'static>, GitError> {
        match self.repo.signature() {
            Ok(signature) => Ok(signature),
            Err(e) if e.code() == ErrorCode::NotFound => match fallback {
                Some(identity) => git2::Signature::now(&identity.name, &identity.email)
                    .map_err(GitError::engine("build signature")),
                None => Err(GitError::MissingIdentity),
            },
            Err(e) => Err(GitError::engine("read signature")(e)),
        }
    }

    /// Commit the index on HEAD. Returns the new commit id.
    ///
    /// Uses the repository's configured identity, else `fallback`.
    pub fn commit(&self, message: &str, fallback: Option<&Identity>) -> Result<Oid, GitError> {
        if message.trim().is_empty() {
            return Err(GitError::EmptyCommitMessage);
        }

        let signature = self.signature(fallback)?;
        let tree_id = self
            .index()?
            .write_tree()
            .map_err(GitError::engine("write tree"))?;
        let tree = self
            .repo
            .find_tree(tree_id)
            .map_err(GitError::engine("read tree"))?;
        let parent = self.head_commit()?;
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .map_err(GitError::engine("create commit"))?;
        tracing::debug!(commit = %oid, "committed");
        to_oid(oid)
    }

    /// Switch the working tree to `branch`.
    ///
    /// A missing local branch is created from the matching remote branch
    /// (`remote` when given, else `default_remote`, else any remote that has
    /// it) and set to track it.
    pub fn checkout(
        &self,
        branch: &BranchName,
        remote: Option<&str>,
        default_remote: &str,
    ) -> Result<CheckoutOutcome, GitError> {
        let created_from = match self.find_local_branch(branch) {
            Ok(_) => None,
            Err(GitError::BranchNotFound { .. }) => {
                let (remote_name, remote_branch) =
                    self.find_remote_branch(branch, remote, default_remote)?;
                let commit = remote_branch
                    .get()
                    .peel_to_commit()
                    .map_err(GitError::engine(format!("resolve {}/{}", remote_name, branch)))?;
                let upstream = format!("{}/{}", remote_name, branch);
                let mut local = self
                    .repo
                    .branch(branch.as_str(), &commit, false)
                    .map_err(GitError::engine(format!("create branch {}", branch)))?;
                local
                    .set_upstream(Some(&upstream))
                    .map_err(GitError::engine(format!("track {}", upstream)))?;
                tracing::info!(branch = %branch, upstream = %upstream, "created tracking branch");
                Some(upstream)
            }
            Err(e) => return Err(e),
        };

        let local_ref = branch.local_ref();
        let target = self
            .repo
            .revparse_single(&local_ref)
            .map_err(GitError::engine(format!("resolve {}", local_ref)))?;
        self.repo
            .checkout_tree(&target, Some(CheckoutBuilder::new().safe()))
            .map_err(GitError::engine(format!("checkout {}", branch)))?;
        self.repo
            .set_head(&local_ref)
            .map_err(GitError::engine("set HEAD"))?;

        Ok(CheckoutOutcome {
            branch: branch.clone(),
            created_from,
        })
    }

    fn find_remote_branch(
        &self,
        branch: &BranchName,
        remote: Option<&str>,
        default_remote: &str,
    ) -> Result<(String, git2::Branch<'_>), GitError> {
        let candidates = match remote {
            Some(explicit) => vec![explicit.to_string()],
            None => {
                let mut names = vec![default_remote.to_string()];
                names.extend(
                    self.remote_names()?
                        .into_iter()
                        .filter(|name| name != default_remote),
                );
                names
            }
        };

        for name in candidates {
            match self
                .repo
                .find_branch(&format!("{}/{}", name, branch), BranchType::Remote)
            {
                Ok(found) => return Ok((name, found)),
                Err(e) if e.code() == ErrorCode::NotFound => continue,
                Err(e) => return Err(GitError::engine(format!("find {}/{}", name, branch))(e)),
            }
        }

        Err(GitError::BranchNotFound {
            name: branch.to_string(),
        })
    }

    // =========================================================================
    // Status and Configuration
    // =========================================================================

    /// Status of every changed path, in libgit2 (path) order.
    pub fn status(&self, include_untracked: bool) -> Result<Vec<StatusEntry>, GitError> {
        let mut options = StatusOptions::new();
        options
            .include_untracked(include_untracked)
            .recurse_untracked_dirs(include_untracked)
            .include_ignored(false);

        let statuses = self
            .repo
            .statuses(Some(&mut options))
            .map_err(GitError::engine("read status"))?;

        Ok(statuses
            .iter()
            .map(|entry| StatusEntry {
                path: String::from_utf8_lossy(entry.path_bytes()).into_owned(),
                status: StatusFlag::from_status(entry.status()),
            })
            .filter(|entry| !entry.status.is_empty())
            .collect())
    }

    /// Merged git configuration (system, global, repository; later wins).
    pub fn config_entries(&self) -> Result<BTreeMap<String, String>, GitError> {
        let config = self
            .repo
            .config()
            .and_then(|mut c| c.snapshot())
            .map_err(GitError::engine("read git config"))?;
        let entries = config
            .entries(None)
            .map_err(GitError::engine("read git config"))?;

        let mut merged = BTreeMap::new();
        entries
            .for_each(|entry| {
                if let (Some(name), Some(value)) = (entry.name(), entry.value()) {
                    merged.insert(name.to_string(), value.to_string());
                }
            })
            .map_err(GitError::engine("read git config"))?;
        Ok(merged)
    }
}

fn to_oid(oid: git2::Oid) -> Result<Oid, GitError> {
    Ok(Oid::new(oid.to_string())?)
}

fn conflicted_paths(index: &git2::Index) -> Result<Vec<String>, GitError> {
    let conflicts = index
        .conflicts()
        .map_err(GitError::engine("read conflicts"))?;
    let mut paths = Vec::new();
    for conflict in conflicts {
        let conflict = conflict.map_err(GitError::engine("read conflicts"))?;
        if let Some(entry) = conflict.our.or(conflict.their).or(conflict.ancestor) {
            paths.push(String::from_utf8_lossy(&entry.path).into_owned());
        }
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    mod git_error {
        use super::*;

        #[test]
        fn detached_head_message() {
            let err = GitError::DetachedHead { operation: "pull" };
            assert_eq!(
                err.to_string(),
                "HEAD is not pointing to a branch, cannot pull"
            );
        }

        #[test]
        fn merge_conflict_lists_paths() {
            let err = GitError::MergeConflict {
                branch: "main".into(),
                upstream: "origin/main".into(),
                paths: vec!["a.txt".into(), "b.txt".into()],
            };
            let msg = err.to_string();
            assert!(msg.contains("origin/main"));
            assert!(msg.contains("a.txt, b.txt"));
        }

        #[test]
        fn engine_error_keeps_message() {
            let err: GitError = GitError::engine("fetch origin")(git2::Error::from_str("boom"));
            assert_eq!(err.engine_message(), Some("boom"));
            assert!(err.to_string().starts_with("fetch origin: "));
        }

        #[test]
        fn non_engine_has_no_engine_message() {
            assert!(GitError::EmptyPathspec.engine_message().is_none());
        }
    }

    mod status_flag {
        use super::*;

        #[test]
        fn index_flags_come_first() {
            let flags = StatusFlag::from_status(git2::Status::WT_MODIFIED | git2::Status::INDEX_NEW);
            assert_eq!(flags, vec![StatusFlag::IndexNew, StatusFlag::WtModified]);
        }

        #[test]
        fn current_maps_to_nothing() {
            assert!(StatusFlag::from_status(git2::Status::CURRENT).is_empty());
        }

        #[test]
        fn serializes_with_libgit2_names() {
            let json = serde_json::to_string(&[StatusFlag::IndexNew, StatusFlag::WtTypechange]).unwrap();
            assert_eq!(json, r#"["INDEX_NEW","WT_TYPECHANGE"]"#);
            assert_eq!(StatusFlag::IndexDeleted.to_string(), "INDEX_DELETED");
        }

        #[test]
        fn names_match_serde() {
            for (_, flag) in StatusFlag::TABLE {
                let json = serde_json::to_string(&flag).unwrap();
                assert_eq!(json.trim_matches('"'), flag.as_str());
            }
        }
    }

    mod outcomes {
        use super::*;

        #[test]
        fn branch_entry_serializes_ref_key() {
            let entry = BranchEntry {
                refname: "refs/heads/main".into(),
                name: "main".into(),
                is_head: true,
            };
            let json = serde_json::to_value(&entry).unwrap();
            assert_eq!(json["ref"], "refs/heads/main");
            assert_eq!(json["is_head"], true);
        }

        #[test]
        fn pull_outcome_tagged() {
            let json = serde_json::to_value(PullOutcome::UpToDate).unwrap();
            assert_eq!(json["result"], "up_to_date");
        }
    }
}
