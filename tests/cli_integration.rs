//! Integration tests for the `gf` binary.
//!
//! Every command runs with HOME and XDG_CONFIG_HOME pointed into a temp
//! directory, so neither gitfacade nor git configuration leaks in from the
//! machine running the tests.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

/// A sandbox with an isolated home and a workspace directory.
struct Sandbox {
    home: TempDir,
    work: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            home: TempDir::new().unwrap(),
            work: TempDir::new().unwrap(),
        }
    }

    /// `gf` running in the workspace.
    fn gf(&self) -> Command {
        let mut cmd = Command::cargo_bin("gf").unwrap();
        cmd.current_dir(self.work.path())
            .env("HOME", self.home.path())
            .env("XDG_CONFIG_HOME", self.home.path().join(".config"))
            .env_remove("GITFACADE_CONFIG")
            .env_remove("GITFACADE_PASSWORD");
        cmd
    }

    /// A repository with a commit identity configured for gf.
    fn with_repo() -> Self {
        let sandbox = Self::new();
        sandbox.gf().arg("init").assert().success();
        sandbox
            .gf()
            .args(["config", "set", "identity", "Test User <test@example.com>"])
            .assert()
            .success();
        sandbox
    }
}

#[test]
fn help_lists_commands() {
    Sandbox::new()
        .gf()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("checkout"))
        .stdout(predicate::str::contains("pull"));
}

#[test]
fn version_flag_works() {
    Sandbox::new()
        .gf()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gf"));
}

#[test]
fn init_creates_repository() {
    let sandbox = Sandbox::new();

    sandbox
        .gf()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized empty repository"));
    sandbox.work.child(".git").assert(predicate::path::is_dir());

    sandbox
        .gf()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Reinitialized existing repository"));
}

#[test]
fn status_outside_repository_fails() {
    Sandbox::new()
        .gf()
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a git repository"));
}

#[test]
fn stage_and_commit_flow() {
    let sandbox = Sandbox::with_repo();
    sandbox.work.child("a.txt").write_str("a\n").unwrap();
    sandbox.work.child("b.txt").write_str("b\n").unwrap();

    sandbox
        .gf()
        .args(["status", "--untracked"])
        .assert()
        .success()
        .stdout(predicate::str::contains("?? a.txt"))
        .stdout(predicate::str::contains("?? b.txt"));

    sandbox.gf().args(["add", "a.txt"]).assert().success();
    sandbox
        .gf()
        .args(["status", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"INDEX_NEW\""))
        .stdout(predicate::str::contains("b.txt").not());

    sandbox
        .gf()
        .args(["commit", "-m", "initial"])
        .assert()
        .success()
        .stdout(predicate::str::contains("initial"));

    sandbox
        .gf()
        .args(["branch", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"is_head\": true"));

    sandbox.gf().args(["rm", "a.txt"]).assert().success();
    sandbox
        .gf()
        .args(["status", "--untracked"])
        .assert()
        .success()
        .stdout(predicate::str::contains("D  a.txt\n"))
        .stdout(predicate::str::contains("?? a.txt\n"));
}

#[test]
fn empty_commit_message_rejected() {
    let sandbox = Sandbox::with_repo();

    sandbox
        .gf()
        .args(["commit", "-m", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("commit message cannot be empty"));
}

#[test]
fn checkout_rejects_invalid_branch_name() {
    let sandbox = Sandbox::with_repo();

    sandbox
        .gf()
        .args(["checkout", "bad..name"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot contain '..'"));
}

#[test]
fn config_defaults_and_updates() {
    let sandbox = Sandbox::new();
    sandbox.gf().arg("init").assert().success();

    sandbox
        .gf()
        .args(["config", "get", "remote"])
        .assert()
        .success()
        .stdout("origin\n");

    sandbox
        .gf()
        .args(["config", "set", "remote", "upstream"])
        .assert()
        .success();
    sandbox
        .gf()
        .args(["config", "get", "remote"])
        .assert()
        .success()
        .stdout("upstream\n");
    sandbox
        .work
        .child(".git/gitfacade/config.toml")
        .assert(predicate::str::contains("upstream"));

    sandbox
        .gf()
        .args(["config", "set", "--global", "leak_threshold", "25"])
        .assert()
        .success();
    sandbox
        .gf()
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("leak_threshold = 25"))
        .stdout(predicate::str::contains("remote = upstream"));
}

#[test]
fn config_rejects_repo_scoped_leak_threshold() {
    let sandbox = Sandbox::new();
    sandbox.gf().arg("init").assert().success();

    sandbox
        .gf()
        .args(["config", "set", "leak_threshold", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--global"));
}

#[test]
fn completion_generates_script() {
    Sandbox::new()
        .gf()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_gf"));
}
