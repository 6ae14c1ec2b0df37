use std::path::PathBuf;

use thiserror::Error;

use ginx_vcs::VcsError;

/// Failure of a single command execution.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("no command given")]
    EmptyCommand,

    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` {}", describe_exit(.code))]
    Exit { program: String, code: Option<i32> },

    #[error("`{program}` timed out after {}s and was killed", .after.as_secs())]
    TimedOut {
        program: String,
        after: std::time::Duration,
    },

    #[error("`{program}` was interrupted by shutdown")]
    Cancelled { program: String },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {code}"),
        None => "was terminated by a signal".to_string(),
    }
}

/// Conditions under which the engine cannot keep a trustworthy working copy
/// and must stop. Every variant maps to a non-zero exit at the driver.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to clone {url} (branch {branch}): {source}")]
    InitialClone {
        url: String,
        branch: String,
        #[source]
        source: VcsError,
    },

    #[error("failed to open existing working copy at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: VcsError,
    },

    #[error("working copy at {path} tracks {found}, expected {expected}")]
    ForeignCopy {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("working copy at {path} is on branch '{found}', expected '{expected}'")]
    WrongBranch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("failed to fetch remote head of branch '{branch}': {source}")]
    RemoteHead {
        branch: String,
        #[source]
        source: VcsError,
    },

    #[error("failed to read local head in {path}: {source}")]
    LocalHead {
        path: PathBuf,
        #[source]
        source: VcsError,
    },

    #[error("failed to remove working copy at {path}: {source}")]
    Discard {
        path: PathBuf,
        #[source]
        source: VcsError,
    },

    #[error("failed to reclone {url} (branch {branch}) into {path}: {source}")]
    Reclone {
        url: String,
        branch: String,
        path: PathBuf,
        #[source]
        source: VcsError,
    },

    #[error("command failed with fail-fast enabled: {source}")]
    CommandFailed {
        #[source]
        source: RunError,
    },

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl EngineError {
    /// Short operation label for structured log fields.
    pub fn operation(&self) -> &'static str {
        match self {
            EngineError::InitialClone { .. } => "clone",
            EngineError::Open { .. } => "open",
            EngineError::ForeignCopy { .. } | EngineError::WrongBranch { .. } => "verify-copy",
            EngineError::RemoteHead { .. } => "remote-head",
            EngineError::LocalHead { .. } => "local-head",
            EngineError::Discard { .. } => "discard",
            EngineError::Reclone { .. } => "reclone",
            EngineError::CommandFailed { .. } => "command",
            EngineError::Runtime(_) => "runtime",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_messages() {
        let err = RunError::Exit {
            program: "make".to_string(),
            code: Some(2),
        };
        assert_eq!(err.to_string(), "`make` exited with status 2");

        let err = RunError::Exit {
            program: "make".to_string(),
            code: None,
        };
        assert_eq!(err.to_string(), "`make` was terminated by a signal");
    }

    #[test]
    fn engine_error_carries_cause() {
        let err = EngineError::RemoteHead {
            branch: "main".to_string(),
            source: VcsError::BranchNotFound {
                branch: "main".to_string(),
                url: "https://example.com/a.git".to_string(),
            },
        };
        assert_eq!(err.operation(), "remote-head");
        let msg = err.to_string();
        assert!(msg.contains("'main'"), "got: {msg}");
        assert!(msg.contains("not found on remote"), "got: {msg}");
    }
}
