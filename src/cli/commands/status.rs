//! status command - Show working tree status

use anyhow::{Context as _, Result};

use super::block_on;
use crate::cli::Context;
use crate::git::{StatusEntry, StatusFlag};

/// Show status, one line per path, or JSON.
pub fn status(ctx: &Context, untracked: bool, json: bool) -> Result<()> {
    let client = ctx.client()?;
    let entries = block_on(client.status(untracked))?.context("Failed to read status")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        if !ctx.quiet {
            println!("nothing to commit, working tree clean");
        }
        return Ok(());
    }

    for entry in &entries {
        for code in short_codes(entry) {
            println!("{} {}", code, entry.path);
        }
    }
    Ok(())
}

/// Two-column codes in the style of `git status --short`.
///
/// A staged change to a path that is also untracked on disk (a staged
/// deletion of a file that still exists) gets two lines, as git prints it.
fn short_codes(entry: &StatusEntry) -> Vec<String> {
    let mut index = ' ';
    let mut worktree = ' ';
    let mut untracked = false;
    for flag in &entry.status {
        match flag {
            StatusFlag::IndexNew => index = 'A',
            StatusFlag::IndexModified => index = 'M',
            StatusFlag::IndexDeleted => index = 'D',
            StatusFlag::IndexRenamed => index = 'R',
            StatusFlag::IndexTypechange => index = 'T',
            StatusFlag::WtNew => untracked = true,
            StatusFlag::WtModified => worktree = 'M',
            StatusFlag::WtDeleted => worktree = 'D',
            StatusFlag::WtTypechange => worktree = 'T',
            StatusFlag::WtRenamed => worktree = 'R',
            StatusFlag::WtUnreadable => worktree = '!',
            StatusFlag::Ignored => {
                index = '!';
                worktree = '!';
            }
            StatusFlag::Conflicted => {
                index = 'U';
                worktree = 'U';
            }
        }
    }

    let mut codes = Vec::new();
    if index != ' ' || worktree != ' ' {
        codes.push(format!("{}{}", index, worktree));
    }
    if untracked {
        codes.push("??".to_string());
    }
    codes
}
