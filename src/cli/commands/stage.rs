//! add, rm and reset commands - Index operations over pathspecs

use anyhow::{Context as _, Result};

use super::block_on;
use crate::cli::Context;
use crate::core::types::Pathspec;
use crate::ui::output;

/// Stage paths.
pub fn add(ctx: &Context, paths: Vec<String>) -> Result<()> {
    let pathspec = Pathspec::from(paths);
    let client = ctx.client()?;
    block_on(client.add(pathspec.clone()))?
        .with_context(|| format!("Failed to add {}", pathspec))?;
    output::debug(format!("staged {}", pathspec), ctx.verbosity());
    Ok(())
}

/// Remove paths from the index.
pub fn rm(ctx: &Context, paths: Vec<String>) -> Result<()> {
    let pathspec = Pathspec::from(paths);
    let client = ctx.client()?;
    block_on(client.remove(pathspec.clone()))?
        .with_context(|| format!("Failed to remove {}", pathspec))?;
    output::print(format!("rm {}", pathspec), ctx.verbosity());
    Ok(())
}

/// Unstage paths back to HEAD.
pub fn reset(ctx: &Context, paths: Vec<String>) -> Result<()> {
    let pathspec = Pathspec::from(paths);
    let client = ctx.client()?;
    block_on(client.reset(pathspec.clone()))?
        .with_context(|| format!("Failed to reset {}", pathspec))?;
    output::print(format!("Unstaged {}", pathspec), ctx.verbosity());
    Ok(())
}
