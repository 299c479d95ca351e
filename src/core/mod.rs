//! core
//!
//! Core domain types, handle lifecycle, and configuration for gitfacade.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid, Pathspec, HandleId, etc.
//! - [`registry`] - Process-wide set of open repository handles
//! - [`handle`] - One open/free bracket around a native repository
//! - [`credentials`] - Declarative transport credentials
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - Every opened handle is released, including on error and panic paths

pub mod config;
pub mod credentials;
pub mod handle;
pub mod registry;
pub mod types;
