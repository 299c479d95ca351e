//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--ssh-key <path>` / `--http-user <name>` / `--anonymous`: Override
//!   configured credentials for this invocation

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// gf - leak-safe git client over libgit2
#[derive(Parser, Debug)]
#[command(name = "gf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if gf was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; disables prompts
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub credentials: CredentialArgs,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Prompts are allowed when not quiet and stdin is a terminal.
    pub fn interactive(&self) -> bool {
        use std::io::IsTerminal;
        !self.quiet && std::io::stdin().is_terminal()
    }
}

/// Credential overrides for remote operations.
#[derive(Args, Debug, Clone, Default)]
pub struct CredentialArgs {
    /// Authenticate with this ssh private key
    #[arg(long, global = true, value_name = "PATH", conflicts_with_all = ["http_user", "anonymous"])]
    pub ssh_key: Option<PathBuf>,

    /// Authenticate over http with this user; the password comes from
    /// $GITFACADE_PASSWORD or a prompt
    #[arg(long, global = true, value_name = "USER", conflicts_with = "anonymous")]
    pub http_user: Option<String>,

    /// Send a username only, no secret
    #[arg(long, global = true)]
    pub anonymous: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a repository in the current directory
    #[command(
        name = "init",
        long_about = "Create an empty repository.\n\n\
            Creates the directory if it does not exist. Running init on an \
            existing repository is safe and leaves its history untouched."
    )]
    Init {
        /// Directory to initialize (default: current directory)
        path: Option<PathBuf>,
    },

    /// Clone a repository
    #[command(
        name = "clone",
        after_help = "\
WORKFLOW EXAMPLES:
    # Clone over ssh with the default key pair
    gf clone git@example.com:team/app.git

    # Clone a specific branch into a named directory
    gf clone https://example.com/team/app.git work --branch develop --http-user ci-bot"
    )]
    Clone {
        /// Remote URL or local path
        url: String,

        /// Target directory (default: derived from the URL)
        dir: Option<PathBuf>,

        /// Branch to check out instead of the remote's default
        #[arg(short, long)]
        branch: Option<String>,
    },

    /// Download objects and refs from a remote
    Fetch {
        /// Remote to fetch (default: configured remote)
        remote: Option<String>,

        /// Fetch every configured remote
        #[arg(long, conflicts_with = "remote")]
        all: bool,
    },

    /// Fetch and merge the upstream of the current branch
    #[command(
        name = "pull",
        long_about = "Fetch all remotes and merge the current branch's upstream.\n\n\
            Fast-forwards when possible, otherwise creates a merge commit. \
            Refuses to run on a detached HEAD. On conflicts the index is left \
            conflicted and the conflicted paths are listed."
    )]
    Pull,

    /// Push the current branch
    #[command(
        name = "push",
        long_about = "Push the current branch.\n\n\
            The remote is the one given, else the branch's upstream remote, \
            else the configured default. A branch without an upstream is \
            pushed under its own name and its upstream is set."
    )]
    Push {
        /// Remote to push to
        remote: Option<String>,
    },

    /// Stage files
    Add {
        /// Paths or globs to stage
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Remove files from the index
    #[command(name = "rm")]
    Rm {
        /// Paths or globs to remove from the index
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Unstage files back to HEAD
    Reset {
        /// Paths or globs to unstage
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Record staged changes
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,
    },

    /// Switch branches
    #[command(
        name = "checkout",
        long_about = "Switch to a local branch.\n\n\
            If the branch only exists on a remote, a local branch is created \
            from it and set to track it. The remote is the one given, else the \
            configured default, else any remote that has the branch.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Switch to an existing branch
    gf checkout main

    # Start tracking a branch that exists on a specific remote
    gf checkout feature/login --remote upstream"
    )]
    Checkout {
        /// Branch to switch to
        branch: String,

        /// Remote to create the branch from if it is not local
        #[arg(long)]
        remote: Option<String>,
    },

    /// Show working tree status
    Status {
        /// Include untracked files
        #[arg(short, long)]
        untracked: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List local branches
    Branch {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change a branch's upstream
    #[command(
        name = "upstream",
        after_help = "\
WORKFLOW EXAMPLES:
    # Track origin/main from the current branch
    gf upstream origin/main

    # Set the upstream of another branch
    gf upstream origin/release --branch release

    # Stop tracking
    gf upstream --unset"
    )]
    Upstream {
        /// Remote-tracking branch to follow, e.g. origin/main
        #[arg(required_unless_present = "unset")]
        upstream: Option<String>,

        /// Branch to change (default: current branch)
        #[arg(long)]
        branch: Option<String>,

        /// Remove the upstream instead of setting one
        #[arg(long, conflicts_with = "upstream")]
        unset: bool,
    },

    /// Get, set, or list configuration values
    #[command(
        name = "config",
        long_about = "View or modify gitfacade configuration.\n\n\
            Repository settings live in .git/gitfacade/config.toml and override \
            the global file (~/.gitfacade/config.toml or $GITFACADE_CONFIG).",
        after_help = "\
WORKFLOW EXAMPLES:
    # List effective configuration
    gf config list

    # Show the merged git configuration instead
    gf config list --git

    # Use a different default remote in this repository
    gf config set remote upstream

    # Raise the leak warning threshold for all repositories
    gf config set --global leak_threshold 32"
    )]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        long_about = "Generate shell completion scripts for tab-completion.\n\n\
            Outputs a completion script for the specified shell.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    gf completion bash >> ~/.bashrc

    # Zsh (add to ~/.zshrc)
    gf completion zsh >> ~/.zshrc

    # Fish
    gf completion fish > ~/.config/fish/completions/gf.fish"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Value to set
        value: String,
        /// Write to the global config instead of the repository
        #[arg(long)]
        global: bool,
    },
    /// List all configuration values
    List {
        /// List the merged git configuration instead
        #[arg(long)]
        git: bool,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
