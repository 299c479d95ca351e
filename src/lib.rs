//! gitfacade - A leak-safe repository client over libgit2
//!
//! gitfacade exposes everyday repository operations (init, clone, fetch,
//! pull, push, add, remove, reset, commit, checkout, status, branches,
//! upstreams) through a small async client, and guarantees that every
//! native repository handle it opens is released again.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to the client)
//! - [`client`] - Async facade; one open/free bracket per operation
//! - [`core`] - Handle registry and lifecycle, credentials, config, strong types
//! - [`git`] - Single interface for all Git operations
//! - [`ui`] - User interaction utilities
//!
//! # Correctness Invariants
//!
//! gitfacade maintains the following invariants:
//!
//! 1. A handle id is registered as open at most once
//! 2. Every opened handle is freed, on success, error and panic paths alike
//! 3. Releasing a handle twice is harmless
//! 4. Too many simultaneously open handles are reported, never silently tolerated

pub mod cli;
pub mod client;
pub mod core;
pub mod git;
pub mod ui;
