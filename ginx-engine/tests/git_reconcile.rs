//! Engine runs over real repositories with `GitCli`.
//!
//! Skipped when no `git` binary is installed.

use std::path::{Path, PathBuf};
use std::process::Command;

use ginx_core::{CommitRef, ReconcileOutcome, SyncPath, WatchTarget};
use ginx_engine::{Engine, ScriptedRunner, Shutdown};
use ginx_vcs::{GitCli, Vcs};
use tempfile::TempDir;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args([
            "-c",
            "user.name=ginx",
            "-c",
            "user.email=ginx@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .output()
        .expect("spawn git");
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn commit(dir: &Path, message: &str) -> CommitRef {
    git(dir, &["commit", "-q", "--allow-empty", "-m", message]);
    CommitRef::from(git(dir, &["rev-parse", "HEAD"]))
}

/// Upstream repo with two commits on `main`.
fn upstream(root: &TempDir) -> PathBuf {
    let dir = root.path().join("upstream");
    std::fs::create_dir_all(&dir).expect("mkdir upstream");
    git(&dir, &["init", "-q"]);
    git(&dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    commit(&dir, "initial");
    commit(&dir, "second");
    dir
}

macro_rules! require_git {
    () => {
        if !git_available() {
            eprintln!("skipping: git is not installed");
            return;
        }
    };
}

#[tokio::test]
async fn rewritten_upstream_history_is_recloned() {
    require_git!();
    let root = TempDir::new().expect("root");
    let upstream = upstream(&root);
    let workdir = root.path().join("copy");

    let mut target = WatchTarget::new(upstream.display().to_string(), "main");
    target.workdir = Some(workdir.clone());
    target.command = vec!["deploy".to_string()];
    let runner = ScriptedRunner::succeeding();
    let vcs = GitCli::new();
    let engine = Engine::new(target, vcs.clone(), runner.clone(), Shutdown::new());

    let mut copy = engine.initialize().await.expect("clone");

    // Force-push: drop the tip and commit something else in its place.
    git(&upstream, &["reset", "-q", "--hard", "HEAD~1"]);
    let rewritten = commit(&upstream, "rewritten");

    let report = engine.poll_cycle(&mut copy).await.expect("cycle");

    assert_eq!(report.remote, rewritten);
    assert_eq!(report.sync, Some(SyncPath::Recloned), "ff-only pull cannot apply");
    assert_eq!(report.outcome, ReconcileOutcome::CommandSucceeded);
    assert_eq!(vcs.local_head(&copy).await.expect("local head"), rewritten);
    assert_eq!(runner.count(), 1);
}

#[tokio::test]
async fn restart_reopens_copy_cloned_from_a_local_path() {
    require_git!();
    let root = TempDir::new().expect("root");
    let upstream = upstream(&root);
    let workdir = root.path().join("copy");
    // Same repository, spelled the way git records a relative source.
    let dotted = root.path().join(".").join("upstream");

    let vcs = GitCli::new();
    vcs.clone_branch(&dotted.display().to_string(), "main", &workdir)
        .await
        .expect("clone");

    let mut target = WatchTarget::new(upstream.display().to_string(), "main");
    target.workdir = Some(workdir.clone());
    let engine = Engine::new(target, vcs, ScriptedRunner::succeeding(), Shutdown::new());

    let copy = engine.initialize().await.expect("reopen own copy");
    assert_eq!(copy.branch, "main");
}
