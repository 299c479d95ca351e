//! commit command - Record staged changes

use anyhow::{Context as _, Result};

use super::block_on;
use crate::cli::Context;
use crate::ui::output;

/// Commit the index with `message`.
pub fn commit(ctx: &Context, message: &str) -> Result<()> {
    let client = ctx.client()?;
    let oid = block_on(client.commit(message))?.context("Commit failed")?;

    let branch = block_on(client.current_branch())?
        .ok()
        .flatten()
        .map(|b| b.to_string())
        .unwrap_or_else(|| "detached HEAD".to_string());
    let summary = message.lines().next().unwrap_or_default();

    output::print(
        format!("[{} {}] {}", branch, oid.short(7), summary),
        ctx.verbosity(),
    );
    Ok(())
}
