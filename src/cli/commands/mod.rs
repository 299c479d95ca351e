//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Calls the repository client to execute the command
//! 3. Formats and displays output
//!
//! Handlers do NOT touch the git engine directly.
//!
//! # Async Commands
//!
//! Client operations are async. Handlers stay synchronous and drive the
//! client on a tokio runtime via [`block_on`].

mod branch;
mod checkout;
mod clone_cmd;
mod commit;
mod completion;
mod config_cmd;
mod init;
mod stage;
mod status;
mod sync;
mod upstream;

pub use branch::branch;
pub use checkout::checkout;
pub use clone_cmd::clone;
pub use commit::commit;
pub use completion::completion;
pub use config_cmd::{get as config_get, list as config_list, set as config_set};
pub use init::init;
pub use stage::{add, reset, rm};
pub use status::status;
pub use sync::{fetch, pull, push};
pub use upstream::upstream;

use std::future::Future;

use anyhow::{Context as _, Result};

use super::args::{Command, ConfigAction};
use super::Context;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Init { path } => init::init(ctx, path.as_deref()),
        Command::Clone { url, dir, branch } => {
            clone_cmd::clone(ctx, &url, dir.as_deref(), branch.as_deref())
        }
        Command::Fetch { remote, all } => sync::fetch(ctx, remote.as_deref(), all),
        Command::Pull => sync::pull(ctx),
        Command::Push { remote } => sync::push(ctx, remote.as_deref()),
        Command::Add { paths } => stage::add(ctx, paths),
        Command::Rm { paths } => stage::rm(ctx, paths),
        Command::Reset { paths } => stage::reset(ctx, paths),
        Command::Commit { message } => commit::commit(ctx, &message),
        Command::Checkout { branch, remote } => {
            checkout::checkout(ctx, &branch, remote.as_deref())
        }
        Command::Status { untracked, json } => status::status(ctx, untracked, json),
        Command::Branch { json } => branch::branch(ctx, json),
        Command::Upstream {
            upstream,
            branch,
            unset,
        } => upstream::upstream(ctx, upstream.as_deref(), branch.as_deref(), unset),
        Command::Config { action } => match action {
            ConfigAction::Get { key } => config_cmd::get(ctx, &key),
            ConfigAction::Set { key, value, global } => config_cmd::set(ctx, &key, &value, global),
            ConfigAction::List { git } => config_cmd::list(ctx, git),
        },
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Run a client future to completion on a fresh runtime.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let rt = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    Ok(rt.block_on(future))
}
