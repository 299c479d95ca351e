//! upstream command - Show or change a branch's upstream

use anyhow::{Context as _, Result};

use super::block_on;
use crate::cli::Context;
use crate::core::types::BranchName;
use crate::ui::output;

/// Set or unset the upstream of `branch`, or of the current branch.
pub fn upstream(
    ctx: &Context,
    upstream: Option<&str>,
    branch: Option<&str>,
    unset: bool,
) -> Result<()> {
    let client = ctx.client()?;
    let target = if unset { None } else { upstream };

    let branch = match branch {
        Some(name) => {
            let name = BranchName::new(name).context("Invalid branch name")?;
            block_on(client.set_upstream(&name, target))?
                .with_context(|| format!("Failed to set upstream of {}", name))?;
            name
        }
        None => block_on(client.set_current_upstream(target))?
            .context("Failed to set upstream of current branch")?,
    };

    let message = match target {
        Some(upstream) => format!("Branch '{}' set up to track '{}'.", branch, upstream),
        None => format!("Branch '{}' no longer tracks an upstream.", branch),
    };
    output::print(message, ctx.verbosity());
    Ok(())
}
