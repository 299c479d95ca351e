//! init command - Create a repository

use std::path::Path;

use anyhow::{Context as _, Result};

use super::block_on;
use crate::cli::Context;
use crate::ui::output;

/// Create (or reinitialize) a repository.
///
/// # Arguments
///
/// * `ctx` - Execution context
/// * `path` - Directory to initialize, relative to the working directory
pub fn init(ctx: &Context, path: Option<&Path>) -> Result<()> {
    let dir = match path {
        Some(path) => ctx.cwd.join(path),
        None => ctx.cwd.clone(),
    };
    let reinit = dir.join(".git").is_dir();

    let (client, _) = ctx.client_for(&dir)?;
    block_on(client.init())?
        .with_context(|| format!("Failed to initialize {}", dir.display()))?;

    let verb = if reinit { "Reinitialized existing" } else { "Initialized empty" };
    output::print(
        format!("{} repository in {}", verb, dir.join(".git").display()),
        ctx.verbosity(),
    );
    Ok(())
}
