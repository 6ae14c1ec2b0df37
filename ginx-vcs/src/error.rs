//! Error types for ginx-vcs.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// All errors that can arise from version-control operations.
#[derive(Debug, Error)]
pub enum VcsError {
    /// The `git` binary could not be started at all.
    #[error("failed to spawn `git {op}`: {source}")]
    Spawn {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// `git` ran and exited unsuccessfully.
    #[error("`git {op}` failed ({status}): {stderr}")]
    Git {
        op: &'static str,
        status: ExitStatus,
        stderr: String,
    },

    /// The watched branch is absent from the remote's ref listing.
    #[error("branch '{branch}' not found on remote {url}")]
    BranchNotFound { branch: String, url: String },

    #[error("{path} is not a git working copy")]
    NotACopy { path: PathBuf },

    #[error("no commit checked out in {path}")]
    NoHead { path: PathBuf },

    /// Output from `git` that does not look like what was asked for.
    #[error("unexpected output from `git {op}`: {output:?}")]
    Malformed { op: &'static str, output: String },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failure injected by [`crate::memory::MemoryVcs`].
    #[error("simulated {op} failure: {reason}")]
    Simulated { op: &'static str, reason: String },
}

/// Convenience constructor for [`VcsError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> VcsError {
    VcsError::Io {
        path: path.into(),
        source,
    }
}
