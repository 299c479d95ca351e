//! clone command - Clone a repository

use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};

use super::block_on;
use crate::cli::Context;
use crate::core::types::BranchName;
use crate::ui::output;

/// Clone `url` into `dir`, or a directory named after the URL.
pub fn clone(ctx: &Context, url: &str, dir: Option<&Path>, branch: Option<&str>) -> Result<()> {
    let target = match dir {
        Some(dir) => ctx.cwd.join(dir),
        None => ctx.cwd.join(directory_for(url)?),
    };
    if target.exists() && target.read_dir().map(|mut d| d.next().is_some()).unwrap_or(true) {
        bail!(
            "Destination '{}' already exists and is not an empty directory",
            target.display()
        );
    }

    let branch = branch
        .map(BranchName::new)
        .transpose()
        .context("Invalid branch name")?;

    let (client, _) = ctx.client_for(&target)?;
    output::print(format!("Cloning into '{}'...", target.display()), ctx.verbosity());
    block_on(client.clone_from(url, branch))?
        .with_context(|| format!("Failed to clone {}", url))?;

    Ok(())
}

/// Directory name git would pick: last path segment without `.git`.
fn directory_for(url: &str) -> Result<PathBuf> {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed);
    let name = last.strip_suffix(".git").unwrap_or(last);

    if name.is_empty() || name == "." || name == ".." {
        bail!("Cannot derive a directory name from '{}'; pass one explicitly", url);
    }
    Ok(PathBuf::from(name))
}
