//! checkout command - Switch branches

use anyhow::{Context as _, Result};

use super::block_on;
use crate::cli::Context;
use crate::core::types::BranchName;
use crate::ui::output;

/// Switch to `branch`, creating a tracking branch from a remote if needed.
pub fn checkout(ctx: &Context, branch: &str, remote: Option<&str>) -> Result<()> {
    let branch = BranchName::new(branch).context("Invalid branch name")?;
    let client = ctx.client()?;

    let outcome = block_on(client.checkout(&branch, remote))?
        .with_context(|| format!("Failed to check out {}", branch))?;

    if let Some(upstream) = &outcome.created_from {
        output::print(
            format!("Branch '{}' set up to track '{}'.", outcome.branch, upstream),
            ctx.verbosity(),
        );
    }
    output::print(
        format!("Switched to branch '{}'", outcome.branch),
        ctx.verbosity(),
    );
    Ok(())
}
