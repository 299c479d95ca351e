//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. All repository reads and
//! writes flow through [`Git`], and all network authentication flows through
//! [`Transport`]. No other module imports `git2`.
//!
//! We use the `git2` crate exclusively (no shelling out to the git CLI).
//!
//! # Responsibilities
//!
//! - Repository creation, cloning and opening
//! - Fetch, pull and push with credential callbacks
//! - Index operations (add, remove, reset) over pathspecs
//! - Commits, checkout and branch upstream configuration
//! - Status and merged configuration queries
//!
//! # Invariants
//!
//! - Pull, push and current-branch upstream changes refuse a detached HEAD
//!   before any side effect
//! - Engine failures are passed through unchanged inside [`GitError::Engine`]
//!
//! # Example
//!
//! ```ignore
//! use gitfacade::core::types::Pathspec;
//! use gitfacade::git::Git;
//! use std::path::Path;
//!
//! let git = Git::init(Path::new("/tmp/repo"))?;
//! git.add(&Pathspec::from("*.txt"))?;
//! let oid = git.commit("initial", None)?;
//! ```

mod interface;
mod transport;

pub use interface::{
    BranchEntry, CheckoutOutcome, Git, GitError, PullOutcome, PushOutcome, StatusEntry,
    StatusFlag,
};
pub use transport::{Transport, MAX_CREDENTIAL_ATTEMPTS};
