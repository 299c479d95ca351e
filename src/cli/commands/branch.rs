//! branch command - List local branches

use anyhow::{Context as _, Result};

use super::block_on;
use crate::cli::Context;

/// List local branches, marking the current one.
pub fn branch(ctx: &Context, json: bool) -> Result<()> {
    let client = ctx.client()?;
    let branches = block_on(client.branches())?.context("Failed to list branches")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&branches)?);
        return Ok(());
    }

    for branch in &branches {
        let marker = if branch.is_head { '*' } else { ' ' };
        println!("{} {}", marker, branch.name);
    }
    Ok(())
}
