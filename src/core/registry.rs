//! core::registry
//!
//! Process-wide bookkeeping of open repository handles.
//!
//! # Architecture
//!
//! Every [`RepositoryHandle`](crate::core::handle::RepositoryHandle) registers
//! its id here when it opens and deregisters when it is freed. The registry is
//! the sole gate against two logical sessions sharing one handle identity, and
//! it surfaces leak risk: when more handles are open than the configured
//! threshold, a warning is logged and reported back to the caller.
//!
//! # Invariants
//!
//! - `open_ids` holds exactly the ids of handles between open and free
//! - An id is never present twice
//! - All access happens under a single lock; the set is never handed out
//!
//! # Example
//!
//! ```
//! use gitfacade::core::registry::HandleRegistry;
//! use gitfacade::core::types::HandleId;
//!
//! let registry = HandleRegistry::new();
//! let id = HandleId::next();
//!
//! registry.register(id).unwrap();
//! assert!(registry.register(id).is_err());
//! assert_eq!(registry.size(), 1);
//!
//! registry.deregister(id);
//! registry.deregister(id); // absent ids are a no-op
//! assert_eq!(registry.size(), 0);
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use thiserror::Error;

use crate::core::types::HandleId;

/// Default number of simultaneously open handles tolerated before warning.
pub const DEFAULT_LEAK_THRESHOLD: usize = 10;

/// Errors from registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The id is already registered as open.
    #[error("handle {id} is already open; free it before opening again")]
    AlreadyOpen {
        /// The conflicting handle id
        id: HandleId,
    },
}

/// Outcome of a successful [`HandleRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// Number of open handles after this registration.
    pub open_count: usize,
    /// Whether `open_count` exceeded the leak threshold.
    pub leak_warning: bool,
}

/// Set of currently open handle ids.
///
/// Use [`HandleRegistry::global`] for the process-wide instance. Separate
/// instances are useful when an embedder wants isolated accounting.
#[derive(Debug)]
pub struct HandleRegistry {
    open_ids: Mutex<HashSet<HandleId>>,
    leak_threshold: AtomicUsize,
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleRegistry {
    /// Create an empty registry with the default leak threshold.
    pub fn new() -> Self {
        Self::with_leak_threshold(DEFAULT_LEAK_THRESHOLD)
    }

    /// Create an empty registry that warns above `threshold` open handles.
    pub fn with_leak_threshold(threshold: usize) -> Self {
        Self {
            open_ids: Mutex::new(HashSet::new()),
            leak_threshold: AtomicUsize::new(threshold),
        }
    }

    /// The process-wide registry.
    ///
    /// Initialized empty on first use and lives until the process exits.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<HandleRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(HandleRegistry::new())).clone()
    }

    /// Record `id` as open.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::AlreadyOpen`] if `id` is already registered; the
    ///   registry is left unchanged.
    pub fn register(&self, id: HandleId) -> Result<Registration, RegistryError> {
        let open_count = {
            let mut open_ids = self.open_ids.lock();
            if !open_ids.insert(id) {
                return Err(RegistryError::AlreadyOpen { id });
            }
            open_ids.len()
        };

        let threshold = self.leak_threshold();
        let leak_warning = open_count > threshold;
        if leak_warning {
            tracing::warn!(
                open = open_count,
                threshold,
                "{} repository handles are open without being freed; this may leak native resources",
                open_count
            );
        }

        Ok(Registration {
            open_count,
            leak_warning,
        })
    }

    /// Remove `id` from the open set.
    ///
    /// Returns whether the id was present. Removing an absent id is not an
    /// error, so cleanup paths may call this more than once.
    pub fn deregister(&self, id: HandleId) -> bool {
        let removed = self.open_ids.lock().remove(&id);
        if !removed {
            tracing::debug!(handle = %id, "deregister of a handle that is not open");
        }
        removed
    }

    /// Number of currently open handles.
    pub fn size(&self) -> usize {
        self.open_ids.lock().len()
    }

    /// Whether `id` is currently registered as open.
    pub fn contains(&self, id: HandleId) -> bool {
        self.open_ids.lock().contains(&id)
    }

    /// Current leak warning threshold.
    pub fn leak_threshold(&self) -> usize {
        self.leak_threshold.load(Ordering::Relaxed)
    }

    /// Change the leak warning threshold. Takes effect on the next register.
    pub fn set_leak_threshold(&self, threshold: usize) {
        self.leak_threshold.store(threshold, Ordering::Relaxed);
    }
}
