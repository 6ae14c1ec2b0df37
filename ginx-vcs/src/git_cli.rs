//! [`Vcs`] backed by the system `git` binary.
//!
//! Every operation shells out through [`tokio::process::Command`] with
//! `GIT_TERMINAL_PROMPT=0`, so a missing credential fails fast instead of
//! blocking the poll loop on an interactive prompt. Credentials come from
//! whatever the user's git is configured with (ssh-agent, credential
//! helpers, `GIT_SSH_COMMAND`).

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, instrument};

use ginx_core::{CommitRef, LocalCopy};

use crate::error::{io_err, VcsError};
use crate::Vcs;

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Shells out to `git` for every operation.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific git executable instead of the one on `PATH`.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, cwd: Option<&Path>) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(dir) = cwd {
            cmd.arg("-C").arg(dir);
        }
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }
}

/// Run `cmd` to completion and return its stdout.
async fn run_git(op: &'static str, mut cmd: Command) -> Result<String, VcsError> {
    debug!(op, "spawning git");
    let output = cmd
        .output()
        .await
        .map_err(|source| VcsError::Spawn { op, source })?;

    if !output.status.success() {
        return Err(VcsError::Git {
            op,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[async_trait]
impl Vcs for GitCli {
    fn is_present(&self, path: &Path) -> bool {
        path.exists()
    }

    #[instrument(skip(self), fields(dest = %path.display()))]
    async fn clone_branch(
        &self,
        url: &str,
        branch: &str,
        path: &Path,
    ) -> Result<LocalCopy, VcsError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_err(parent, e))?;
        }

        let mut cmd = self.command(None);
        cmd.arg("clone")
            .arg("--branch")
            .arg(branch)
            .arg("--single-branch")
            .arg("--recurse-submodules")
            .arg("--")
            .arg(url)
            .arg(path);
        run_git("clone", cmd).await?;

        info!("git clone succeeded");
        Ok(LocalCopy::new(path, branch))
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn open(&self, path: &Path) -> Result<LocalCopy, VcsError> {
        if !path.is_dir() {
            return Err(VcsError::NotACopy {
                path: path.to_path_buf(),
            });
        }

        let mut cmd = self.command(Some(path));
        cmd.arg("rev-parse").arg("--show-toplevel");
        let toplevel = match run_git("rev-parse", cmd).await {
            Ok(out) => PathBuf::from(out.trim()),
            Err(VcsError::Git { .. }) => {
                return Err(VcsError::NotACopy {
                    path: path.to_path_buf(),
                })
            }
            Err(err) => return Err(err),
        };

        // A directory nested inside some other repository is not our copy.
        let canonical = tokio::fs::canonicalize(path)
            .await
            .map_err(|e| io_err(path, e))?;
        let resolved = tokio::fs::canonicalize(&toplevel).await;
        let toplevel = resolved.unwrap_or(toplevel);
        if canonical != toplevel {
            return Err(VcsError::NotACopy {
                path: path.to_path_buf(),
            });
        }

        let mut cmd = self.command(Some(path));
        cmd.arg("rev-parse").arg("--abbrev-ref").arg("HEAD");
        let branch = run_git("rev-parse", cmd).await?.trim().to_string();

        Ok(LocalCopy::new(path, branch))
    }

    async fn origin_url(&self, copy: &LocalCopy) -> Result<String, VcsError> {
        let mut cmd = self.command(Some(&copy.path));
        cmd.arg("remote").arg("get-url").arg("origin");
        let url = run_git("remote get-url", cmd).await?;
        Ok(url.trim().to_string())
    }

    #[instrument(skip(self, copy), fields(path = %copy.path.display(), branch = %copy.branch))]
    async fn pull(&self, copy: &LocalCopy) -> Result<(), VcsError> {
        let mut cmd = self.command(Some(&copy.path));
        cmd.arg("pull")
            .arg("--ff-only")
            .arg("origin")
            .arg(&copy.branch);
        run_git("pull", cmd).await?;
        debug!("git pull succeeded");
        Ok(())
    }

    async fn remote_head(&self, copy: &LocalCopy, branch: &str) -> Result<CommitRef, VcsError> {
        let mut cmd = self.command(Some(&copy.path));
        cmd.arg("ls-remote")
            .arg("--heads")
            .arg("origin")
            .arg(format!("refs/heads/{branch}"));
        let listing = run_git("ls-remote", cmd).await?;

        match parse_ls_remote(&listing, branch) {
            Some(commit) => Ok(commit),
            None => {
                let url = self
                    .origin_url(copy)
                    .await
                    .unwrap_or_else(|_| "origin".to_string());
                Err(VcsError::BranchNotFound {
                    branch: branch.to_string(),
                    url,
                })
            }
        }
    }

    async fn local_head(&self, copy: &LocalCopy) -> Result<CommitRef, VcsError> {
        let mut cmd = self.command(Some(&copy.path));
        cmd.arg("rev-parse").arg("--verify").arg("HEAD");
        let out = match run_git("rev-parse", cmd).await {
            Ok(out) => out,
            Err(VcsError::Git { stderr, .. }) if is_missing_head(&stderr) => {
                return Err(VcsError::NoHead {
                    path: copy.path.clone(),
                })
            }
            Err(err) => return Err(err),
        };

        let id = out.trim();
        if !is_commit_id(id) {
            return Err(VcsError::Malformed {
                op: "rev-parse",
                output: out,
            });
        }
        Ok(CommitRef::from(id))
    }

    async fn discard(&self, path: &Path) -> Result<(), VcsError> {
        match tokio::fs::remove_dir_all(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_err(path, err)),
        }
    }
}

// ---------------------------------------------------------------------------
// Output parsing
// ---------------------------------------------------------------------------

/// Find the exact `refs/heads/<branch>` line in `git ls-remote` output.
///
/// Lines look like `<sha>\t<refname>`. `ls-remote` matches patterns by
/// suffix, so `refs/heads/feature/main` can appear when asking for `main`;
/// only the exact ref counts.
fn parse_ls_remote(listing: &str, branch: &str) -> Option<CommitRef> {
    let wanted = format!("refs/heads/{branch}");
    listing.lines().find_map(|line| {
        let (id, name) = line.split_once('\t')?;
        (name.trim() == wanted && is_commit_id(id.trim())).then(|| CommitRef::from(id.trim()))
    })
}

/// SHA-1 (40) or SHA-256 (64) hex object id.
fn is_commit_id(s: &str) -> bool {
    matches!(s.len(), 40 | 64) && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_missing_head(stderr: &str) -> bool {
    stderr.contains("Needed a single revision")
        || stderr.contains("unknown revision")
        || stderr.contains("ambiguous argument 'HEAD'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA_A: &str = "1111111111111111111111111111111111111111";
    const SHA_B: &str = "2222222222222222222222222222222222222222";

    #[test]
    fn ls_remote_picks_exact_branch() {
        let listing = format!("{SHA_A}\trefs/heads/feature/main\n{SHA_B}\trefs/heads/main\n");
        assert_eq!(parse_ls_remote(&listing, "main"), Some(CommitRef::from(SHA_B)));
    }

    #[test]
    fn ls_remote_missing_branch_is_none() {
        let listing = format!("{SHA_A}\trefs/heads/develop\n");
        assert_eq!(parse_ls_remote(&listing, "main"), None);
        assert_eq!(parse_ls_remote("", "main"), None);
    }

    #[test]
    fn ls_remote_ignores_garbage_ids() {
        let listing = "not-a-sha\trefs/heads/main\n";
        assert_eq!(parse_ls_remote(listing, "main"), None);
    }

    #[test]
    fn commit_id_shapes() {
        assert!(is_commit_id(SHA_A));
        assert!(is_commit_id(&"a".repeat(64)));
        assert!(!is_commit_id("abc123"));
        assert!(!is_commit_id(&"g".repeat(40)));
    }

    #[test]
    fn missing_head_detection() {
        assert!(is_missing_head("fatal: Needed a single revision\n"));
        assert!(!is_missing_head("fatal: not a git repository"));
    }
}
