//! fetch, pull and push commands

use anyhow::{Context as _, Result};

use super::block_on;
use crate::cli::Context;
use crate::git::{PullOutcome, PushOutcome};
use crate::ui::output;

/// Fetch one remote, or every remote with `all`.
pub fn fetch(ctx: &Context, remote: Option<&str>, all: bool) -> Result<()> {
    let client = ctx.client()?;

    let fetched = if all {
        block_on(client.fetch_all())?.context("Fetch failed")?
    } else {
        let name = remote.unwrap_or(client.default_remote()).to_string();
        block_on(client.fetch(Some(&name)))?
            .with_context(|| format!("Failed to fetch {}", name))?;
        vec![name]
    };

    for name in fetched {
        output::print(format!("Fetched {}", name), ctx.verbosity());
    }
    Ok(())
}

/// Fetch and merge the current branch's upstream.
pub fn pull(ctx: &Context) -> Result<()> {
    let client = ctx.client()?;
    let outcome = block_on(client.pull())?.context("Pull failed")?;

    let message = match outcome {
        PullOutcome::UpToDate => "Already up to date.".to_string(),
        PullOutcome::FastForward { to } => format!("Fast-forward to {}", to.short(7)),
        PullOutcome::Merged { commit } => format!("Merge made as {}", commit.short(7)),
    };
    output::print(message, ctx.verbosity());
    Ok(())
}

/// Push the current branch.
pub fn push(ctx: &Context, remote: Option<&str>) -> Result<()> {
    let client = ctx.client()?;
    let PushOutcome {
        remote,
        refspec,
        upstream_set,
    } = block_on(client.push(remote))?.context("Push failed")?;

    output::print(format!("Pushed {} to {}", refspec, remote), ctx.verbosity());
    if upstream_set {
        output::print(
            format!("Upstream set to {}", upstream_label(&remote, &refspec)),
            ctx.verbosity(),
        );
    }
    Ok(())
}

/// `origin/main` for remote `origin` and refspec `refs/heads/x:refs/heads/main`.
fn upstream_label(remote: &str, refspec: &str) -> String {
    let dst = refspec.rsplit(':').next().unwrap_or(refspec);
    let branch = dst.strip_prefix("refs/heads/").unwrap_or(dst);
    format!("{}/{}", remote, branch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_from_refspec() {
        assert_eq!(
            upstream_label("origin", "refs/heads/topic:refs/heads/topic"),
            "origin/topic"
        );
    }
}
